//! Wrapped items: one row's complete rendering unit.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rebind_core::{Payload, RenderTypeId};

use crate::adapter::BindContext;
use crate::error::ConstructionError;

/// Establishes "this is the same row" across submissions.
///
/// Callers either supply a stable key or fall back to the item's position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemId {
    Key(u64),
    Index(usize),
}

impl From<u64> for ItemId {
    fn from(key: u64) -> Self {
        Self::Key(key)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "key {key}"),
            Self::Index(index) => write!(f, "index {index}"),
        }
    }
}

/// Constructs the presentation object for a target. Receives the scrolling
/// container as an opaque `&mut dyn Any`; the engine never inspects it.
pub type TargetFactory =
    Arc<dyn Fn(&mut dyn Any) -> Result<Box<dyn Any + Send>, ConstructionError> + Send + Sync>;

/// Applies an item's payload to a render target during a bind pass.
pub type BindFn = Arc<dyn Fn(&mut BindContext<'_>) + Send + Sync>;

/// Side-channel callback dispatched on container lifecycle events.
pub type EventFn = Arc<dyn Fn() + Send + Sync>;

/// One row's complete rendering unit: identity, payload, layout hints, and
/// the factory/bind closure pair.
///
/// Items are created fresh on every submission and never mutated afterwards;
/// the adapter retains only the most recent accepted sequence. Two items are
/// the same row iff their ids are equal, and unchanged iff additionally their
/// payloads are structurally equal.
#[derive(Clone)]
pub struct WrappedItem {
    pub id: ItemId,
    pub type_id: RenderTypeId,
    pub payload: Payload,
    /// Column span hint, passed through to the layout integration.
    pub span: u32,
    /// When set, the item spans every column regardless of `span`.
    pub full_span: bool,
    pub create: TargetFactory,
    pub bind: BindFn,
    pub on_click: Option<EventFn>,
    pub on_attach: Option<EventFn>,
    pub on_detach: Option<EventFn>,
}

impl WrappedItem {
    pub fn new(
        id: impl Into<ItemId>,
        type_id: RenderTypeId,
        payload: Payload,
        create: TargetFactory,
        bind: BindFn,
    ) -> Self {
        Self {
            id: id.into(),
            type_id,
            payload,
            span: 1,
            full_span: false,
            create,
            bind,
            on_click: None,
            on_attach: None,
            on_detach: None,
        }
    }

    pub fn with_span(mut self, span: u32) -> Self {
        self.span = span;
        self
    }

    pub fn with_full_span(mut self, full_span: bool) -> Self {
        self.full_span = full_span;
        self
    }

    pub fn on_click(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(callback));
        self
    }

    pub fn on_attach(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_attach = Some(Arc::new(callback));
        self
    }

    pub fn on_detach(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_detach = Some(Arc::new(callback));
        self
    }

    /// Same row as `other`?
    pub fn same_item(&self, other: &Self) -> bool {
        self.id == other.id
    }

    /// Same row with unchanged content?
    pub fn same_content(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl fmt::Debug for WrappedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedItem")
            .field("id", &self.id)
            .field("type_id", &self.type_id)
            .field("payload", &self.payload)
            .field("span", &self.span)
            .field("full_span", &self.full_span)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal view object used by the foundation tests.
    #[derive(Debug, Default)]
    pub(crate) struct TestView {
        pub(crate) title: String,
        pub(crate) binds: usize,
    }

    pub(crate) fn test_item(key: u64, type_id: RenderTypeId, payload: Payload) -> WrappedItem {
        WrappedItem::new(
            key,
            type_id,
            payload,
            Arc::new(|_container| Ok(Box::new(TestView::default()) as Box<dyn Any + Send>)),
            Arc::new(|ctx| {
                let title = match ctx.payload() {
                    Payload::Text(text) => text.to_string(),
                    other => format!("{other:?}"),
                };
                ctx.check_and_run((title.as_str(),), |view| {
                    let view = view.downcast_mut::<TestView>().expect("test view");
                    view.title = title.clone();
                    view.binds += 1;
                });
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_item;
    use super::*;

    #[test]
    fn identity_and_content_contracts() {
        let type_id = RenderTypeId::reserved(1);
        let a = test_item(7, type_id, Payload::from("a"));
        let b = test_item(7, type_id, Payload::from("b"));
        let c = test_item(9, type_id, Payload::from("a"));

        assert!(a.same_item(&b));
        assert!(!a.same_content(&b));
        assert!(!a.same_item(&c));
        assert!(a.same_content(&c));
    }

    #[test]
    fn span_hints_pass_through() {
        let item = test_item(1, RenderTypeId::reserved(0), Payload::Unit)
            .with_span(2)
            .with_full_span(true);
        assert_eq!(item.span, 2);
        assert!(item.full_span);
    }
}
