//! The live DOM, as seen by the differ.
//!
//! Nodes and listeners are referred to by opaque keys so that the virtual tree doesn't depend on any particular host.
//! [`web::WebHost`] drives a browser document through [`web_sys`],
//! [`memory::MemoryHost`] keeps a headless in-memory document.

use crate::{error::Result, event::Event};
use slotmap::new_key_type;
use std::rc::Rc;

pub mod memory;
pub mod web;

new_key_type! {
	/// Handle of a live DOM node.
	pub struct NodeKey;

	/// Handle of an attached event listener.
	pub struct ListenerKey;
}

/// Native listener callback, invoked with the host's event already wrapped.
pub type Handler = Rc<dyn Fn(Event)>;

/// Frame callback, run once on the host's next paint.
pub type FrameCallback = Box<dyn FnOnce()>;

/// Primitive DOM operations.
///
/// All methods take `&self` since hosts are driven from a single event loop thread
/// and callbacks (listeners, frames) may re-enter them.
///
/// # Handles
///
/// A [`NodeKey`] stays valid until [`release`](`Host::release`)d, independently of whether the node is attached.
/// Releasing a node also drops its listeners. Operations on released keys fail with [`Error::UnknownNode`](`crate::Error::UnknownNode`).
pub trait Host: 'static {
	fn create_element(&self, tag: &str) -> Result<NodeKey>;
	fn create_text(&self, text: &str) -> Result<NodeKey>;

	fn append_child(&self, parent: NodeKey, child: NodeKey) -> Result<()>;
	/// Puts `new_child` where `old_child` is, detaching the latter.
	fn replace_child(&self, parent: NodeKey, new_child: NodeKey, old_child: NodeKey) -> Result<()>;
	fn remove_child(&self, parent: NodeKey, child: NodeKey) -> Result<()>;

	fn set_text(&self, node: NodeKey, text: &str) -> Result<()>;
	fn attribute(&self, node: NodeKey, name: &str) -> Result<Option<String>>;
	fn set_attribute(&self, node: NodeKey, name: &str, value: &str) -> Result<()>;
	fn remove_attribute(&self, node: NodeKey, name: &str) -> Result<()>;

	fn add_event_listener(&self, node: NodeKey, event: &str, handler: Handler) -> Result<ListenerKey>;
	fn remove_event_listener(&self, node: NodeKey, listener: ListenerKey) -> Result<()>;

	/// Forgets a handle. The node may be discarded by the host once it is detached.
	fn release(&self, node: NodeKey);

	/// Appends rules to the one shared stylesheet. Nothing is ever removed from it.
	fn append_css(&self, css: &str) -> Result<()>;

	fn request_animation_frame(&self, callback: FrameCallback) -> Result<()>;
}
