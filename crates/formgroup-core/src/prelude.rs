pub use crate::{
    CssHooks, Document, ElementKind, Event, FormError, MarkupRenderer, NodeId, Properties,
    RenderBackend, Result, Snapshot, StateRecord, StoreError,
};
