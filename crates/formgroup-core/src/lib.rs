//! # Form groups backed by a snapshot file
//!
//! Formgroup builds groups of form inputs whose state is mirrored to a
//! persisted snapshot on every change. This crate holds the pieces that every
//! other layer agrees on:
//!
//! - `StateRecord` / `Properties` / `Snapshot` — the data that flows between
//!   instances and the store.
//! - `Document` — a retained tree of view nodes (containers, headings,
//!   descriptions, inputs) with attribute reflection and event listeners.
//! - `RenderBackend` — hosts consume a `Document` to paint it.
//! - `FormError` / `StoreError` — the error taxonomy.
//!
//! ## State records
//!
//! Every instance state is a record with at least a `value` entry:
//!
//! ```rust
//! use formgroup_core::*;
//!
//! let mut state = StateRecord::new("hello");
//! state.insert("placeholder", "type here");
//! assert_eq!(state.value_text(), "hello");
//!
//! let blank = state.blanked();
//! assert!(blank.is_empty_value());
//! assert_eq!(blank.get("placeholder").and_then(|v| v.as_str()), Some(""));
//! ```
//!
//! ## Documents
//!
//! ```rust
//! use formgroup_core::*;
//!
//! let mut doc = Document::new();
//! let root = doc.create_element(ElementKind::Container);
//! let input = doc.create_element(ElementKind::Input);
//! doc.set_attribute(input, "value", "42");
//! doc.append_child(root, input);
//!
//! let mut markup = MarkupRenderer::new();
//! markup.commit(&doc, root);
//! assert_eq!(markup.output(), r#"<div><input value="42"></div>"#);
//! ```

pub mod css;
pub mod error;
pub mod input;
pub mod prelude;
pub mod render_api;
pub mod state;
pub mod tests;
pub mod view;

pub use css::*;
pub use error::*;
pub use input::*;
pub use render_api::*;
pub use state::*;
pub use view::*;
