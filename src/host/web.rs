//! Browser host on top of [`web_sys`].

use super::{FrameCallback, Handler, Host, ListenerKey, NodeKey};
use crate::{
	error::{Error, Result},
	event::{Event, RawEvent},
};
use core::{any::Any, cell::RefCell};
use js_sys::Reflect;
use slotmap::SlotMap;
use std::rc::Rc;
use tracing::{instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

struct WebListener {
	node: NodeKey,
	event: String,
	closure: Closure<dyn Fn(web_sys::Event)>,
}

/// Drives a browser document.
///
/// Listener closures are owned by this instance. They start throwing into JavaScript if it is dropped
/// while their elements are still attached somewhere.
pub struct WebHost {
	window: web_sys::Window,
	document: web_sys::Document,
	stylesheet: web_sys::Element,
	nodes: RefCell<SlotMap<NodeKey, web_sys::Node>>,
	listeners: RefCell<SlotMap<ListenerKey, WebListener>>,
}

fn js_error(operation: &'static str) -> impl FnOnce(JsValue) -> Error {
	move |error| Error::host(operation, format!("{:?}", error))
}

impl WebHost {
	/// Binds to the current window's document.
	///
	/// The shared stylesheet is the `<style>` element with id `stylesheet_id`, which is created in `<head>` if missing.
	///
	/// # Errors
	///
	/// Iff there is no window, document or `<head>`, or the stylesheet can't be created.
	#[instrument]
	pub fn new(stylesheet_id: &str) -> Result<Self> {
		let window = web_sys::window().ok_or(Error::NoDocument)?;
		let document = window.document().ok_or(Error::NoDocument)?;
		let stylesheet = match document.get_element_by_id(stylesheet_id) {
			Some(existing) => {
				trace!("Reusing existing stylesheet element.");
				existing
			}
			None => {
				let head = document.head().ok_or(Error::NoDocument)?;
				let style = document.create_element("style").map_err(js_error("createElement"))?;
				style.set_id(stylesheet_id);
				head.append_child(&style).map_err(js_error("appendChild"))?;
				style
			}
		};

		Ok(Self {
			window,
			document,
			stylesheet,
			nodes: RefCell::new(SlotMap::with_key()),
			listeners: RefCell::new(SlotMap::with_key()),
		})
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Hands out a handle for an existing node, for example a mount point.
	pub fn adopt(&self, node: web_sys::Node) -> NodeKey {
		self.nodes.borrow_mut().insert(node)
	}

	/// Adopts the element with the given id.
	///
	/// # Errors
	///
	/// Iff no such element exists.
	pub fn mount_point(&self, element_id: &str) -> Result<NodeKey> {
		let element = self.document.get_element_by_id(element_id).ok_or_else(|| Error::ContainerNotFound(element_id.to_owned()))?;
		Ok(self.adopt(element.into()))
	}

	/// The live node behind a handle.
	#[must_use]
	pub fn node(&self, key: NodeKey) -> Option<web_sys::Node> {
		self.nodes.borrow().get(key).cloned()
	}

	fn get(&self, key: NodeKey) -> Result<web_sys::Node> {
		self.node(key).ok_or(Error::UnknownNode(key))
	}

	fn element(&self, key: NodeKey, operation: &'static str) -> Result<web_sys::Element> {
		self.get(key)?.dyn_into::<web_sys::Element>().map_err(|node| Error::host(operation, format!("not an element: {:?}", node)))
	}
}

impl Host for WebHost {
	fn create_element(&self, tag: &str) -> Result<NodeKey> {
		let element = self.document.create_element(tag).map_err(js_error("createElement"))?;
		Ok(self.adopt(element.into()))
	}

	fn create_text(&self, text: &str) -> Result<NodeKey> {
		Ok(self.adopt(self.document.create_text_node(text).into()))
	}

	fn append_child(&self, parent: NodeKey, child: NodeKey) -> Result<()> {
		self.get(parent)?.append_child(&self.get(child)?).map_err(js_error("appendChild"))?;
		Ok(())
	}

	fn replace_child(&self, parent: NodeKey, new_child: NodeKey, old_child: NodeKey) -> Result<()> {
		self.get(parent)?
			.replace_child(&self.get(new_child)?, &self.get(old_child)?)
			.map_err(js_error("replaceChild"))?;
		Ok(())
	}

	fn remove_child(&self, parent: NodeKey, child: NodeKey) -> Result<()> {
		self.get(parent)?.remove_child(&self.get(child)?).map_err(js_error("removeChild"))?;
		Ok(())
	}

	fn set_text(&self, node: NodeKey, text: &str) -> Result<()> {
		self.get(node)?.set_text_content(Some(text));
		Ok(())
	}

	fn attribute(&self, node: NodeKey, name: &str) -> Result<Option<String>> {
		Ok(self.element(node, "getAttribute")?.get_attribute(name))
	}

	fn set_attribute(&self, node: NodeKey, name: &str, value: &str) -> Result<()> {
		self.element(node, "setAttribute")?.set_attribute(name, value).map_err(js_error("setAttribute"))
	}

	fn remove_attribute(&self, node: NodeKey, name: &str) -> Result<()> {
		self.element(node, "removeAttribute")?.remove_attribute(name).map_err(js_error("removeAttribute"))
	}

	fn add_event_listener(&self, node: NodeKey, event: &str, handler: Handler) -> Result<ListenerKey> {
		let target = self.get(node)?;
		let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
			let at_target = event.event_phase() == web_sys::Event::AT_TARGET;
			let event = Event::new(Rc::new(event), node);
			handler(if at_target { event.with_target(node) } else { event })
		}) as Box<dyn Fn(web_sys::Event)>);
		target
			.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
			.map_err(js_error("addEventListener"))?;
		Ok(self.listeners.borrow_mut().insert(WebListener {
			node,
			event: event.to_owned(),
			closure,
		}))
	}

	fn remove_event_listener(&self, node: NodeKey, listener: ListenerKey) -> Result<()> {
		let removed = self.listeners.borrow_mut().remove(listener);
		match removed {
			Some(WebListener { node: bound_to, event, closure }) => {
				if bound_to != node {
					warn!("Listener {:?} was bound to {:?}, not {:?}.", listener, bound_to, node);
				}
				self.get(bound_to)?
					.remove_event_listener_with_callback(&event, closure.as_ref().unchecked_ref())
					.map_err(js_error("removeEventListener"))
			}
			None => Err(Error::host("removeEventListener", format!("unknown listener {:?}", listener))),
		}
	}

	fn release(&self, node: NodeKey) {
		if self.nodes.borrow_mut().remove(node).is_none() {
			warn!("Released unknown node handle {:?}.", node);
		}
		// A detached node that dispatches again after this throws into JavaScript.
		self.listeners.borrow_mut().retain(|_, listener| listener.node != node);
	}

	fn append_css(&self, css: &str) -> Result<()> {
		self.stylesheet
			.append_child(&self.document.create_text_node(css))
			.map_err(js_error("appendChild"))?;
		Ok(())
	}

	fn request_animation_frame(&self, callback: FrameCallback) -> Result<()> {
		let callback = Closure::once_into_js(move || callback());
		self.window
			.request_animation_frame(callback.unchecked_ref())
			.map_err(js_error("requestAnimationFrame"))?;
		Ok(())
	}
}

fn property(target: &JsValue, property: &str) -> Option<JsValue> {
	Reflect::get(target, &JsValue::from_str(property)).ok()
}

impl RawEvent for web_sys::Event {
	fn event_type(&self) -> String {
		web_sys::Event::type_(self)
	}

	fn bubbles(&self) -> bool {
		web_sys::Event::bubbles(self)
	}

	fn cancelable(&self) -> bool {
		web_sys::Event::cancelable(self)
	}

	fn time_stamp(&self) -> f64 {
		web_sys::Event::time_stamp(self)
	}

	fn prevent_default(&self) {
		web_sys::Event::prevent_default(self)
	}

	fn default_prevented(&self) -> bool {
		web_sys::Event::default_prevented(self)
	}

	fn stop_propagation(&self) {
		web_sys::Event::stop_propagation(self)
	}

	fn stop_immediate_propagation(&self) {
		web_sys::Event::stop_immediate_propagation(self)
	}

	fn number(&self, name: &str) -> Option<f64> {
		property(self.as_ref(), name)?.as_f64()
	}

	fn flag(&self, name: &str) -> Option<bool> {
		property(self.as_ref(), name)?.as_bool()
	}

	fn string(&self, name: &str) -> Option<String> {
		property(self.as_ref(), name)?.as_string()
	}

	fn present(&self, name: &str) -> bool {
		property(self.as_ref(), name).map_or(false, |value| !value.is_null() && !value.is_undefined())
	}

	fn target_string(&self, name: &str) -> Option<String> {
		property(self.target()?.as_ref(), name)?.as_string()
	}

	fn target_flag(&self, name: &str) -> Option<bool> {
		property(self.target()?.as_ref(), name)?.as_bool()
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}
