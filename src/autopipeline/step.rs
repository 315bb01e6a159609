//! Pipeline steps: a fixed component or a choice among components

use crate::components::{Component, ComponentChoice, ComponentFactory, ComponentProperties};
use std::fmt;

/// A fixed component together with the factory that can rebuild it
pub struct ComponentNode {
    factory: ComponentFactory,
    instance: Box<dyn Component>,
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentNode").field(&self.instance).finish()
    }
}

impl ComponentNode {
    pub fn new(factory: ComponentFactory) -> Self {
        let instance = factory();
        Self { factory, instance }
    }

    /// Fresh instance from the same factory
    pub fn unconfigured(&self) -> Self {
        Self::new(self.factory.clone())
    }

    pub fn properties(&self) -> ComponentProperties {
        self.instance.properties()
    }

    pub fn component(&self) -> &dyn Component {
        self.instance.as_ref()
    }

    pub fn component_mut(&mut self) -> &mut dyn Component {
        self.instance.as_mut()
    }
}

/// The two node kinds a pipeline step can hold
#[derive(Debug)]
pub enum PipelineNode {
    Component(ComponentNode),
    Choice(ComponentChoice),
}

impl PipelineNode {
    /// Same node kind and candidates, nothing configured or fitted
    pub fn unconfigured(&self) -> Self {
        match self {
            Self::Component(node) => Self::Component(node.unconfigured()),
            Self::Choice(choice) => Self::Choice(choice.unconfigured()),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Component(_) => "component",
            Self::Choice(_) => "choice",
        }
    }

    pub fn as_choice(&self) -> Option<&ComponentChoice> {
        match self {
            Self::Choice(choice) => Some(choice),
            Self::Component(_) => None,
        }
    }

    /// The component doing the work; `None` for a choice with nothing selected
    pub fn component(&self) -> Option<&dyn Component> {
        match self {
            Self::Component(node) => Some(node.component()),
            Self::Choice(choice) => choice.selected(),
        }
    }

    pub fn component_mut(&mut self) -> Option<&mut dyn Component> {
        match self {
            Self::Component(node) => Some(node.component_mut()),
            Self::Choice(choice) => choice.selected_mut(),
        }
    }

    pub fn set_random_state(&mut self, seed: u64) {
        match self {
            Self::Component(node) => node.component_mut().set_random_state(seed),
            Self::Choice(choice) => choice.set_random_state(seed),
        }
    }
}

/// A named position in the pipeline
#[derive(Debug)]
pub struct PipelineStep {
    pub name: String,
    pub node: PipelineNode,
}

impl PipelineStep {
    pub fn component(name: impl Into<String>, factory: ComponentFactory) -> Self {
        Self {
            name: name.into(),
            node: PipelineNode::Component(ComponentNode::new(factory)),
        }
    }

    pub fn choice(name: impl Into<String>, choice: ComponentChoice) -> Self {
        Self {
            name: name.into(),
            node: PipelineNode::Choice(choice),
        }
    }

    pub fn unconfigured(&self) -> Self {
        Self {
            name: self.name.clone(),
            node: self.node.unconfigured(),
        }
    }
}
