//! Shared helpers for unit tests

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::Component;
use crate::element::{same_props, Element, ElementRef};
use crate::error::Result;
use crate::key::ElementKey;

/// Route `tracing` output to the test harness
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared event log
pub(crate) type Log = Rc<RefCell<Vec<String>>>;

pub(crate) fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub(crate) fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// Element that renders nothing and logs each render
#[derive(Clone)]
pub(crate) struct Leaf {
    pub key: Option<ElementKey>,
    pub value: u32,
    pub log: Log,
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

impl Leaf {
    pub(crate) fn new(value: u32, log: &Log) -> Self {
        Self {
            key: None,
            value,
            log: log.clone(),
        }
    }

    pub(crate) fn keyed(key: impl Into<ElementKey>, value: u32, log: &Log) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(value, log)
        }
    }
}

impl Element for Leaf {
    fn key(&self) -> Option<&ElementKey> {
        self.key.as_ref()
    }

    fn props_eq(&self, previous: &dyn Element) -> bool {
        same_props(self, previous)
    }

    fn render_subtree(&self) -> Result<bool> {
        self.log.borrow_mut().push(format!("leaf {}", self.value));
        Ok(true)
    }
}

/// A second element type, for type mismatches
pub(crate) struct OtherLeaf {
    pub key: Option<ElementKey>,
    pub log: Log,
}

impl Element for OtherLeaf {
    fn key(&self) -> Option<&ElementKey> {
        self.key.as_ref()
    }

    fn render_subtree(&self) -> Result<bool> {
        self.log.borrow_mut().push("other".to_string());
        Ok(true)
    }
}

/// Component rendering a fixed child; pure over `value`
pub(crate) struct Wrapper {
    pub value: u32,
    pub child: Option<ElementRef>,
    pub log: Log,
}

impl Component for Wrapper {
    fn props_eq(&self, previous: &dyn Element) -> bool {
        previous
            .as_any()
            .downcast_ref::<Wrapper>()
            .is_some_and(|previous| previous.value == self.value)
    }

    fn render(&self) -> Result<Option<ElementRef>> {
        self.log.borrow_mut().push(format!("wrapper {}", self.value));
        Ok(self.child.clone())
    }
}
