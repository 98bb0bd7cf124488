//! Headless host that keeps its document in memory and logs every mutation.
//!
//! Handy wherever there is no browser: Native tests, server-side rendering, measuring how much a patch touched.

use super::{FrameCallback, Handler, Host, ListenerKey, NodeKey};
use crate::{
	error::{Error, Result},
	event::{Event, RawEvent},
};
use core::{
	any::Any,
	cell::{Cell, RefCell},
	mem,
};
use hashbrown::HashMap;
use slotmap::SlotMap;
use std::{collections::BTreeMap, rc::Rc};
use tracing::{trace, trace_span, warn};

/// One primitive DOM operation, as recorded by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
	CreateElement { node: NodeKey, tag: String },
	CreateText { node: NodeKey, text: String },
	AppendChild { parent: NodeKey, child: NodeKey },
	ReplaceChild { parent: NodeKey, new_child: NodeKey, old_child: NodeKey },
	RemoveChild { parent: NodeKey, child: NodeKey },
	SetText { node: NodeKey, text: String },
	SetAttribute { node: NodeKey, name: String, value: String },
	RemoveAttribute { node: NodeKey, name: String },
	AddEventListener { node: NodeKey, event: String },
	RemoveEventListener { node: NodeKey, event: String },
	AppendCss { css: String },
}

#[derive(Debug)]
enum NodeData {
	Element { tag: String, attributes: BTreeMap<String, String> },
	Text(String),
}

#[derive(Debug)]
struct MemoryNode {
	data: NodeData,
	parent: Option<NodeKey>,
	children: Vec<NodeKey>,
}

struct MemoryListener {
	node: NodeKey,
	event: String,
	handler: Handler,
}

/// An in-memory document.
///
/// Frames requested through [`Host::request_animation_frame`] are queued until [`MemoryHost::run_frames`] is called.
/// Released nodes disappear from the arena, so [`MemoryHost::contains`] can be used to check for leaks.
/// Failures can be scripted with [`MemoryHost::fail_next`].
#[derive(Default)]
pub struct MemoryHost {
	nodes: RefCell<SlotMap<NodeKey, MemoryNode>>,
	listeners: RefCell<SlotMap<ListenerKey, MemoryListener>>,
	stylesheet: RefCell<String>,
	frames: RefCell<Vec<FrameCallback>>,
	mutations: RefCell<Vec<Mutation>>,
	failures: RefCell<Vec<&'static str>>,
}

impl MemoryHost {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a detached element to mount into. This isn't logged as a mutation.
	pub fn create_root(&self, tag: &str) -> NodeKey {
		self.nodes.borrow_mut().insert(MemoryNode {
			data: NodeData::Element {
				tag: tag.to_owned(),
				attributes: BTreeMap::new(),
			},
			parent: None,
			children: Vec::new(),
		})
	}

	/// Every mutation since creation or the last [`clear_mutations`](`MemoryHost::clear_mutations`).
	#[must_use]
	pub fn mutations(&self) -> Vec<Mutation> {
		self.mutations.borrow().clone()
	}

	pub fn take_mutations(&self) -> Vec<Mutation> {
		mem::take(&mut *self.mutations.borrow_mut())
	}

	pub fn clear_mutations(&self) {
		self.mutations.borrow_mut().clear();
	}

	/// Makes the next call of `operation` fail with [`Error::Host`].
	///
	/// Operations are named after their DOM methods: `"createElement"`, `"createTextNode"`, `"appendChild"`,
	/// `"replaceChild"`, `"removeChild"`, `"setText"`, `"setAttribute"`, `"removeAttribute"`,
	/// `"addEventListener"` and `"removeEventListener"`. Arming the same one twice fails two calls.
	pub fn fail_next(&self, operation: &'static str) {
		self.failures.borrow_mut().push(operation);
	}

	#[must_use]
	pub fn pending_frames(&self) -> usize {
		self.frames.borrow().len()
	}

	/// Runs the frames queued so far. Frames requested while running wait for the next call.
	///
	/// Returns how many frames ran.
	pub fn run_frames(&self) -> usize {
		let frames = mem::take(&mut *self.frames.borrow_mut());
		let count = frames.len();
		let _span = trace_span!("run_frames", count).entered();
		for frame in frames {
			frame();
		}
		count
	}

	/// Whether a handle is still live.
	#[must_use]
	pub fn contains(&self, node: NodeKey) -> bool {
		self.nodes.borrow().contains_key(node)
	}

	/// How many node handles are live.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.nodes.borrow().len()
	}

	#[must_use]
	pub fn parent(&self, node: NodeKey) -> Option<NodeKey> {
		self.nodes.borrow().get(node)?.parent
	}

	#[must_use]
	pub fn children(&self, node: NodeKey) -> Vec<NodeKey> {
		self.nodes.borrow().get(node).map(|node| node.children.clone()).unwrap_or_default()
	}

	/// The tag name, for elements.
	#[must_use]
	pub fn tag(&self, node: NodeKey) -> Option<String> {
		match &self.nodes.borrow().get(node)?.data {
			NodeData::Element { tag, .. } => Some(tag.clone()),
			NodeData::Text(_) => None,
		}
	}

	/// The text, for text nodes.
	#[must_use]
	pub fn text(&self, node: NodeKey) -> Option<String> {
		match &self.nodes.borrow().get(node)?.data {
			NodeData::Text(text) => Some(text.clone()),
			NodeData::Element { .. } => None,
		}
	}

	#[must_use]
	pub fn get_attribute(&self, node: NodeKey, name: &str) -> Option<String> {
		match &self.nodes.borrow().get(node)?.data {
			NodeData::Element { attributes, .. } => attributes.get(name).cloned(),
			NodeData::Text(_) => None,
		}
	}

	/// Names of the events `node` currently listens to.
	#[must_use]
	pub fn listened_events(&self, node: NodeKey) -> Vec<String> {
		self.listeners
			.borrow()
			.values()
			.filter(|listener| listener.node == node)
			.map(|listener| listener.event.clone())
			.collect()
	}

	/// Everything appended to the shared stylesheet so far.
	#[must_use]
	pub fn stylesheet(&self) -> String {
		self.stylesheet.borrow().clone()
	}

	/// Serialises `node` and its descendants.
	///
	/// Attributes are written in name order.
	#[must_use]
	pub fn html(&self, node: NodeKey) -> String {
		let mut html = String::new();
		self.write_html(node, &mut html);
		html
	}

	/// Serialises only the children of `node`.
	#[must_use]
	pub fn inner_html(&self, node: NodeKey) -> String {
		let mut html = String::new();
		for child in self.children(node) {
			self.write_html(child, &mut html);
		}
		html
	}

	fn write_html(&self, node: NodeKey, html: &mut String) {
		let (data, children) = match self.nodes.borrow().get(node) {
			Some(MemoryNode { data: NodeData::Text(text), .. }) => {
				html.push_str(&escape(text));
				return;
			}
			Some(MemoryNode {
				data: NodeData::Element { tag, attributes },
				children,
				..
			}) => ((tag.clone(), attributes.clone()), children.clone()),
			None => return,
		};

		let (tag, attributes) = data;
		html.push('<');
		html.push_str(&tag);
		for (name, value) in attributes {
			html.push(' ');
			html.push_str(&name);
			html.push_str("=\"");
			html.push_str(&escape(&value));
			html.push('"');
		}
		html.push('>');
		for child in children {
			self.write_html(child, html);
		}
		html.push_str("</");
		html.push_str(&tag);
		html.push('>');
	}

	/// Dispatches `event` at `target`, bubbling through its ancestors if the event [bubbles](`RawEvent::bubbles`).
	///
	/// Handlers may freely mutate the document or attach and detach listeners.
	/// Returns how many handlers ran.
	pub fn dispatch(&self, target: NodeKey, event: Rc<SyntheticEvent>) -> usize {
		let _span = trace_span!("dispatch", event = %event.event_type).entered();

		let mut path = vec![target];
		if event.bubbles {
			let nodes = self.nodes.borrow();
			let mut current = nodes.get(target).and_then(|node| node.parent);
			while let Some(ancestor) = current {
				path.push(ancestor);
				current = nodes.get(ancestor).and_then(|node| node.parent);
			}
		}

		let raw: Rc<dyn RawEvent> = event.clone();
		let mut ran = 0;
		for node in path {
			let handlers: Vec<Handler> = self
				.listeners
				.borrow()
				.values()
				.filter(|listener| listener.node == node && listener.event == event.event_type)
				.map(|listener| Rc::clone(&listener.handler))
				.collect();
			for handler in handlers {
				handler(Event::new(Rc::clone(&raw), node).with_target(target));
				ran += 1;
				if event.immediate_propagation_stopped.get() {
					return ran;
				}
			}
			if event.propagation_stopped.get() {
				break;
			}
		}
		ran
	}

	fn log(&self, mutation: Mutation) {
		trace!(?mutation);
		self.mutations.borrow_mut().push(mutation);
	}

	fn injected(&self, operation: &'static str) -> Result<()> {
		let mut failures = self.failures.borrow_mut();
		match failures.iter().position(|armed| *armed == operation) {
			Some(i) => {
				failures.remove(i);
				warn!(operation, "Failing as scripted.");
				Err(Error::host(operation, "scripted failure"))
			}
			None => Ok(()),
		}
	}

	fn check(&self, node: NodeKey) -> Result<()> {
		if self.contains(node) {
			Ok(())
		} else {
			Err(Error::UnknownNode(node))
		}
	}

	fn detach(nodes: &mut SlotMap<NodeKey, MemoryNode>, child: NodeKey) {
		if let Some(parent) = nodes[child].parent.take() {
			if let Some(parent) = nodes.get_mut(parent) {
				parent.children.retain(|c| *c != child);
			}
		}
	}

	fn position(nodes: &SlotMap<NodeKey, MemoryNode>, parent: NodeKey, child: NodeKey, operation: &'static str) -> Result<usize> {
		nodes[parent]
			.children
			.iter()
			.position(|c| *c == child)
			.ok_or_else(|| Error::host(operation, format!("{:?} is not a child of {:?}", child, parent)))
	}

	fn with_attributes<T>(&self, node: NodeKey, operation: &'static str, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> Result<T> {
		match self.nodes.borrow_mut().get_mut(node) {
			Some(MemoryNode {
				data: NodeData::Element { attributes, .. },
				..
			}) => Ok(f(attributes)),
			Some(_) => Err(Error::host(operation, "not an element")),
			None => Err(Error::UnknownNode(node)),
		}
	}
}

impl Host for MemoryHost {
	fn create_element(&self, tag: &str) -> Result<NodeKey> {
		self.injected("createElement")?;
		let node = self.create_root(tag);
		self.log(Mutation::CreateElement { node, tag: tag.to_owned() });
		Ok(node)
	}

	fn create_text(&self, text: &str) -> Result<NodeKey> {
		self.injected("createTextNode")?;
		let node = self.nodes.borrow_mut().insert(MemoryNode {
			data: NodeData::Text(text.to_owned()),
			parent: None,
			children: Vec::new(),
		});
		self.log(Mutation::CreateText { node, text: text.to_owned() });
		Ok(node)
	}

	fn append_child(&self, parent: NodeKey, child: NodeKey) -> Result<()> {
		self.injected("appendChild")?;
		self.check(parent)?;
		self.check(child)?;
		{
			let mut nodes = self.nodes.borrow_mut();
			if let NodeData::Text(_) = nodes[parent].data {
				return Err(Error::host("appendChild", "text nodes can't have children"));
			}
			Self::detach(&mut nodes, child);
			nodes[parent].children.push(child);
			nodes[child].parent = Some(parent);
		}
		self.log(Mutation::AppendChild { parent, child });
		Ok(())
	}

	fn replace_child(&self, parent: NodeKey, new_child: NodeKey, old_child: NodeKey) -> Result<()> {
		self.injected("replaceChild")?;
		self.check(parent)?;
		self.check(new_child)?;
		self.check(old_child)?;
		{
			let mut nodes = self.nodes.borrow_mut();
			Self::position(&nodes, parent, old_child, "replaceChild")?;
			Self::detach(&mut nodes, new_child);
			let index = Self::position(&nodes, parent, old_child, "replaceChild")?;
			nodes[parent].children[index] = new_child;
			nodes[new_child].parent = Some(parent);
			nodes[old_child].parent = None;
		}
		self.log(Mutation::ReplaceChild { parent, new_child, old_child });
		Ok(())
	}

	fn remove_child(&self, parent: NodeKey, child: NodeKey) -> Result<()> {
		self.injected("removeChild")?;
		self.check(parent)?;
		self.check(child)?;
		{
			let mut nodes = self.nodes.borrow_mut();
			let index = Self::position(&nodes, parent, child, "removeChild")?;
			nodes[parent].children.remove(index);
			nodes[child].parent = None;
		}
		self.log(Mutation::RemoveChild { parent, child });
		Ok(())
	}

	fn set_text(&self, node: NodeKey, text: &str) -> Result<()> {
		self.injected("setText")?;
		{
			let mut nodes = self.nodes.borrow_mut();
			let target = nodes.get_mut(node).ok_or(Error::UnknownNode(node))?;
			match &mut target.data {
				NodeData::Text(current) => *current = text.to_owned(),
				NodeData::Element { .. } => return Err(Error::host("setText", "not a text node")),
			}
		}
		self.log(Mutation::SetText { node, text: text.to_owned() });
		Ok(())
	}

	fn attribute(&self, node: NodeKey, name: &str) -> Result<Option<String>> {
		self.with_attributes(node, "getAttribute", |attributes| attributes.get(name).cloned())
	}

	fn set_attribute(&self, node: NodeKey, name: &str, value: &str) -> Result<()> {
		self.injected("setAttribute")?;
		self.with_attributes(node, "setAttribute", |attributes| {
			attributes.insert(name.to_owned(), value.to_owned());
		})?;
		self.log(Mutation::SetAttribute {
			node,
			name: name.to_owned(),
			value: value.to_owned(),
		});
		Ok(())
	}

	fn remove_attribute(&self, node: NodeKey, name: &str) -> Result<()> {
		self.injected("removeAttribute")?;
		self.with_attributes(node, "removeAttribute", |attributes| {
			attributes.remove(name);
		})?;
		self.log(Mutation::RemoveAttribute { node, name: name.to_owned() });
		Ok(())
	}

	fn add_event_listener(&self, node: NodeKey, event: &str, handler: Handler) -> Result<ListenerKey> {
		self.injected("addEventListener")?;
		self.check(node)?;
		let listener = self.listeners.borrow_mut().insert(MemoryListener {
			node,
			event: event.to_owned(),
			handler,
		});
		self.log(Mutation::AddEventListener { node, event: event.to_owned() });
		Ok(listener)
	}

	fn remove_event_listener(&self, node: NodeKey, listener: ListenerKey) -> Result<()> {
		self.injected("removeEventListener")?;
		let removed = self.listeners.borrow_mut().remove(listener);
		match removed {
			Some(MemoryListener { node: bound_to, event, .. }) => {
				if bound_to != node {
					warn!("Listener {:?} was bound to {:?}, not {:?}.", listener, bound_to, node);
				}
				self.log(Mutation::RemoveEventListener { node: bound_to, event });
				Ok(())
			}
			None => Err(Error::host("removeEventListener", format!("unknown listener {:?}", listener))),
		}
	}

	fn release(&self, node: NodeKey) {
		{
			let mut nodes = self.nodes.borrow_mut();
			match nodes.remove(node) {
				Some(removed) => {
					if let Some(parent) = removed.parent.and_then(|parent| nodes.get_mut(parent)) {
						parent.children.retain(|c| *c != node);
					}
					for child in removed.children {
						if let Some(child) = nodes.get_mut(child) {
							child.parent = None;
						}
					}
				}
				None => warn!("Released unknown node handle {:?}.", node),
			}
		}
		self.listeners.borrow_mut().retain(|_, listener| listener.node != node);
	}

	fn append_css(&self, css: &str) -> Result<()> {
		self.stylesheet.borrow_mut().push_str(css);
		self.log(Mutation::AppendCss { css: css.to_owned() });
		Ok(())
	}

	fn request_animation_frame(&self, callback: FrameCallback) -> Result<()> {
		self.frames.borrow_mut().push(callback);
		Ok(())
	}
}

fn escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	escaped
}

/// A scripted event for [`MemoryHost::dispatch`].
///
/// Bubbling and cancelable by default.
#[derive(Debug)]
pub struct SyntheticEvent {
	event_type: String,
	bubbles: bool,
	cancelable: bool,
	time_stamp: f64,
	numbers: HashMap<String, f64>,
	flags: HashMap<String, bool>,
	strings: HashMap<String, String>,
	target_strings: HashMap<String, String>,
	target_flags: HashMap<String, bool>,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
	immediate_propagation_stopped: Cell<bool>,
}

impl SyntheticEvent {
	#[must_use]
	pub fn new(event_type: impl Into<String>) -> Self {
		Self {
			event_type: event_type.into(),
			bubbles: true,
			cancelable: true,
			time_stamp: 0.0,
			numbers: HashMap::new(),
			flags: HashMap::new(),
			strings: HashMap::new(),
			target_strings: HashMap::new(),
			target_flags: HashMap::new(),
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
			immediate_propagation_stopped: Cell::new(false),
		}
	}

	#[must_use]
	pub fn with_bubbles(mut self, bubbles: bool) -> Self {
		self.bubbles = bubbles;
		self
	}

	#[must_use]
	pub fn with_cancelable(mut self, cancelable: bool) -> Self {
		self.cancelable = cancelable;
		self
	}

	#[must_use]
	pub fn with_time_stamp(mut self, time_stamp: f64) -> Self {
		self.time_stamp = time_stamp;
		self
	}

	#[must_use]
	pub fn with_number(mut self, property: impl Into<String>, value: f64) -> Self {
		self.numbers.insert(property.into(), value);
		self
	}

	#[must_use]
	pub fn with_flag(mut self, property: impl Into<String>, value: bool) -> Self {
		self.flags.insert(property.into(), value);
		self
	}

	#[must_use]
	pub fn with_string(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
		self.strings.insert(property.into(), value.into());
		self
	}

	/// Sets a property the event's target is supposed to have, like an input's `value`.
	#[must_use]
	pub fn with_target_string(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
		self.target_strings.insert(property.into(), value.into());
		self
	}

	#[must_use]
	pub fn with_target_flag(mut self, property: impl Into<String>, value: bool) -> Self {
		self.target_flags.insert(property.into(), value);
		self
	}

	#[must_use]
	pub fn propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}
}

impl RawEvent for SyntheticEvent {
	fn event_type(&self) -> String {
		self.event_type.clone()
	}

	fn bubbles(&self) -> bool {
		self.bubbles
	}

	fn cancelable(&self) -> bool {
		self.cancelable
	}

	fn time_stamp(&self) -> f64 {
		self.time_stamp
	}

	fn prevent_default(&self) {
		if self.cancelable {
			self.default_prevented.set(true);
		}
	}

	fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}

	fn stop_immediate_propagation(&self) {
		self.propagation_stopped.set(true);
		self.immediate_propagation_stopped.set(true);
	}

	fn number(&self, property: &str) -> Option<f64> {
		self.numbers.get(property).copied()
	}

	fn flag(&self, property: &str) -> Option<bool> {
		self.flags.get(property).copied()
	}

	fn string(&self, property: &str) -> Option<String> {
		self.strings.get(property).cloned()
	}

	fn present(&self, property: &str) -> bool {
		self.numbers.contains_key(property) || self.flags.contains_key(property) || self.strings.contains_key(property)
	}

	fn target_string(&self, property: &str) -> Option<String> {
		self.target_strings.get(property).cloned()
	}

	fn target_flag(&self, property: &str) -> Option<bool> {
		self.target_flags.get(property).copied()
	}

	fn as_any(&self) -> &dyn Any {
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn serialises_in_attribute_order() {
		let host = MemoryHost::new();
		let root = host.create_root("div");
		let p = host.create_element("p").unwrap();
		host.set_attribute(p, "title", "a \"b\"").unwrap();
		host.set_attribute(p, "id", "x").unwrap();
		let text = host.create_text("1 < 2").unwrap();
		host.append_child(p, text).unwrap();
		host.append_child(root, p).unwrap();

		assert_eq!(host.html(root), "<div><p id=\"x\" title=\"a &quot;b&quot;\">1 &lt; 2</p></div>");
		assert_eq!(host.inner_html(root), "<p id=\"x\" title=\"a &quot;b&quot;\">1 &lt; 2</p>");
	}

	#[test]
	fn replace_keeps_position() {
		let host = MemoryHost::new();
		let root = host.create_root("ul");
		let a = host.create_element("li").unwrap();
		let b = host.create_element("li").unwrap();
		let c = host.create_element("ol").unwrap();
		host.append_child(root, a).unwrap();
		host.append_child(root, b).unwrap();
		host.replace_child(root, c, a).unwrap();

		assert_eq!(host.children(root), vec![c, b]);
		assert_eq!(host.parent(a), None);
	}

	#[test]
	fn removing_a_stranger_fails() {
		let host = MemoryHost::new();
		let root = host.create_root("div");
		let loose = host.create_element("span").unwrap();
		assert!(matches!(host.remove_child(root, loose), Err(Error::Host { operation: "removeChild", .. })));
	}

	#[test]
	fn scripted_failures_fire_once() {
		let host = MemoryHost::new();
		let root = host.create_root("div");
		host.fail_next("setAttribute");
		assert!(matches!(host.set_attribute(root, "id", "x"), Err(Error::Host { operation: "setAttribute", .. })));
		assert_eq!(host.get_attribute(root, "id"), None);
		assert!(host.mutations().is_empty());

		host.set_attribute(root, "id", "x").unwrap();
		assert_eq!(host.get_attribute(root, "id").as_deref(), Some("x"));
	}

	#[test]
	fn release_drops_listeners() {
		let host = MemoryHost::new();
		let root = host.create_root("div");
		host.add_event_listener(root, "click", Rc::new(|_: Event| ())).unwrap();
		assert_eq!(host.listened_events(root), vec!["click".to_owned()]);

		host.release(root);
		assert!(!host.contains(root));
		assert!(host.listened_events(root).is_empty());
		assert!(matches!(host.set_attribute(root, "id", "x"), Err(Error::UnknownNode(_))));
	}

	#[test]
	fn dispatch_bubbles_until_stopped() {
		let host = MemoryHost::new();
		let outer = host.create_root("div");
		let middle = host.create_element("div").unwrap();
		let inner = host.create_element("button").unwrap();
		host.append_child(outer, middle).unwrap();
		host.append_child(middle, inner).unwrap();

		let seen = Rc::new(RefCell::new(Vec::new()));
		for node in [outer, middle, inner].iter().copied() {
			let seen = Rc::clone(&seen);
			host.add_event_listener(
				node,
				"click",
				Rc::new(move |event: Event| {
					assert_eq!(event.target(), Some(inner));
					seen.borrow_mut().push(event.current_target());
					if event.current_target() == middle {
						event.stop_propagation();
					}
				}),
			)
			.unwrap();
		}

		let ran = host.dispatch(inner, Rc::new(SyntheticEvent::new("click")));
		assert_eq!(ran, 2);
		assert_eq!(*seen.borrow(), vec![inner, middle]);

		seen.borrow_mut().clear();
		host.dispatch(inner, Rc::new(SyntheticEvent::new("click").with_bubbles(false)));
		assert_eq!(*seen.borrow(), vec![inner]);
	}

	#[test]
	fn frames_wait_for_the_next_run() {
		let host = Rc::new(MemoryHost::new());
		let count = Rc::new(Cell::new(0));
		{
			let count = Rc::clone(&count);
			let inner_host = Rc::clone(&host);
			host.request_animation_frame(Box::new(move || {
				count.set(count.get() + 1);
				let count = Rc::clone(&count);
				inner_host.request_animation_frame(Box::new(move || count.set(count.get() + 10))).unwrap();
			}))
			.unwrap();
		}

		assert_eq!(host.pending_frames(), 1);
		assert_eq!(host.run_frames(), 1);
		assert_eq!(count.get(), 1);
		assert_eq!(host.pending_frames(), 1);
		host.run_frames();
		assert_eq!(count.get(), 11);
	}

	#[test]
	fn prevent_default_respects_cancelable() {
		let event = SyntheticEvent::new("submit").with_cancelable(false);
		event.prevent_default();
		assert!(!event.default_prevented());

		let event = SyntheticEvent::new("submit");
		event.prevent_default();
		assert!(event.default_prevented());
	}
}
