//! Form input groups whose state lives in a snapshot file.
//!
//! A [`FormGroup`] owns one store file, a registry of groups and the view
//! [`Document`] the groups are built into. Every state change runs the same
//! cycle: every instance state is written to the file, the file is read back
//! and every instance is overwritten and re-rendered from what was read.
//!
//! ```no_run
//! use formgroup::*;
//! use serde_json::json;
//!
//! # fn main() -> Result<()> {
//! let form = FormGroup::open("form.json")?;
//! form.register_handler("save", |event, instance| {
//!     instance.set_state(event.value()).map(drop)
//! });
//!
//! form.input_group(
//!     GroupOptions::new("hello")
//!         .group_key("greeting")
//!         .events(json!({ "input": "save" })),
//! )?;
//! let input = form.instances("greeting")[0].node()?;
//! form.input(input, "hello world")?;
//!
//! assert_eq!(
//!     form.get_group_data("greeting")?,
//!     Some(vec![StateRecord::new("hello world")])
//! );
//! # Ok(())
//! # }
//! ```

mod engine;
mod groups;
mod instance;
pub mod options;
pub mod registry;
mod removable;

pub use engine::FormGroup;
pub use instance::{Handler, InstanceRef};
pub use options::{
    ADD_NEW_LABEL, DEFAULT_MAX, EventSpec, GroupLayout, GroupOptions, NormalizedOptions,
    REMOVE_LABEL, RemovableSettings,
};
pub use registry::{Instance, InstanceId, Registry};
pub use removable::RemovableControls;

pub use formgroup_core::*;
pub use formgroup_store::{Encoding, MAX_INDENT_WIDTH, SnapshotStore, StoreOptions};
