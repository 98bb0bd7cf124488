//! The virtual node model.
//!
//! A [`VNode`] describes one DOM node for one render generation.
//! Children are owned exclusively by their parent; a tree is built bottom-up with the builder methods
//! and then handed to a [`Renderer`](`crate::Renderer`), which binds DOM handles onto it.

use crate::{
	component::ComponentRef,
	event::{Callback, Event, FocusEvent, InputEvent, KeyboardEvent, MouseEvent},
	host::{ListenerKey, NodeKey},
	scheduler::ComponentId,
	style::Stylesheet,
};
use core::{
	cell::RefCell,
	fmt::{self, Display},
	hash::{Hash, Hasher},
};
use hashbrown::HashMap;
use std::{borrow::Cow, rc::Rc};

macro_rules! closed_name_set {
	(
		$(#[$attr:meta])*
		pub enum $name:ident {
			$($(#[$variant_attr:meta])* $variant:ident => $text:literal,)+
		}
	) => {
		$(#[$attr])*
		///
		/// Equality and hashing go by [`as_str`](`Self::as_str`),
		/// so a `Custom` spelling of a known name is the same key as the known variant.
		#[derive(Debug, Clone)]
		pub enum $name {
			$($(#[$variant_attr])* $variant,)+
			Custom(Cow<'static, str>),
		}

		impl $name {
			#[must_use]
			pub fn as_str(&self) -> &str {
				match self {
					$(Self::$variant => $text,)+
					Self::Custom(name) => name,
				}
			}

			/// Maps known names onto their variant and everything else onto `Custom`.
			pub fn from_name(name: impl Into<Cow<'static, str>>) -> Self {
				let name = name.into();
				match &*name {
					$($text => Self::$variant,)+
					_ => Self::Custom(name),
				}
			}
		}

		impl PartialEq for $name {
			fn eq(&self, other: &Self) -> bool {
				self.as_str() == other.as_str()
			}
		}
		impl Eq for $name {}

		impl Hash for $name {
			fn hash<H: Hasher>(&self, state: &mut H) {
				self.as_str().hash(state)
			}
		}

		impl Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(self.as_str())
			}
		}

		impl From<&'static str> for $name {
			fn from(name: &'static str) -> Self {
				Self::from_name(name)
			}
		}

		impl From<String> for $name {
			fn from(name: String) -> Self {
				Self::from_name(name)
			}
		}
	};
}

closed_name_set! {
	/// Attribute names, with an escape hatch for everything not listed.
	pub enum AttrName {
		Id => "id",
		Class => "class",
		Href => "href",
		Src => "src",
		Alt => "alt",
		Type => "type",
		Value => "value",
		Placeholder => "placeholder",
		Name => "name",
		Title => "title",
		For => "for",
		Role => "role",
		TabIndex => "tabindex",
		Disabled => "disabled",
		Checked => "checked",
		Selected => "selected",
		ReadOnly => "readonly",
		/// Inline declarations. Stylesheet classes go through [`VNode::style`] instead.
		Style => "style",
	}
}

closed_name_set! {
	/// DOM event names, with an escape hatch for everything not listed.
	pub enum EventKind {
		Click => "click",
		DblClick => "dblclick",
		MouseDown => "mousedown",
		MouseUp => "mouseup",
		MouseOver => "mouseover",
		MouseOut => "mouseout",
		MouseMove => "mousemove",
		Input => "input",
		Change => "change",
		KeyDown => "keydown",
		KeyUp => "keyup",
		KeyPress => "keypress",
		Focus => "focus",
		Blur => "blur",
		Submit => "submit",
	}
}

/// An attribute value. Every variant is written to the DOM through its [`Display`] form.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
	Str(Cow<'static, str>),
	Bool(bool),
	Int(i64),
	Float(f64),
}

impl Display for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttrValue::Str(s) => f.write_str(s),
			AttrValue::Bool(b) => Display::fmt(b, f),
			AttrValue::Int(i) => Display::fmt(i, f),
			AttrValue::Float(x) => Display::fmt(x, f),
		}
	}
}

impl From<&'static str> for AttrValue {
	fn from(s: &'static str) -> Self {
		Self::Str(s.into())
	}
}

impl From<String> for AttrValue {
	fn from(s: String) -> Self {
		Self::Str(s.into())
	}
}

impl From<bool> for AttrValue {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl From<i32> for AttrValue {
	fn from(i: i32) -> Self {
		Self::Int(i.into())
	}
}

impl From<i64> for AttrValue {
	fn from(i: i64) -> Self {
		Self::Int(i)
	}
}

impl From<u32> for AttrValue {
	fn from(i: u32) -> Self {
		Self::Int(i.into())
	}
}

impl From<f64> for AttrValue {
	fn from(x: f64) -> Self {
		Self::Float(x)
	}
}

/// Discriminant of [`VNode`] content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Element,
	Text,
	Component,
}

pub(crate) enum Content {
	Element(Cow<'static, str>),
	Text(String),
	Component(ComponentRef),
}

/// A listener attached to a live node. The slot's callback is swapped on update instead of re-listening.
pub(crate) struct Listener {
	pub(crate) key: ListenerKey,
	pub(crate) slot: Rc<RefCell<Callback>>,
}

/// The live side of a materialized node.
pub(crate) struct Binding {
	pub(crate) node: NodeKey,
	pub(crate) listeners: HashMap<EventKind, Listener>,
}

/// One node of a virtual tree.
///
/// `Clone` produces a fresh generation: everything except the DOM binding is copied.
pub struct VNode {
	pub(crate) content: Content,
	pub(crate) attributes: HashMap<AttrName, AttrValue>,
	pub(crate) events: HashMap<EventKind, Callback>,
	pub(crate) children: Vec<VNode>,
	pub(crate) key: Option<String>,
	pub(crate) style: Option<Rc<dyn Stylesheet>>,
	pub(crate) binding: Option<Binding>,
	/// Components whose rendered subtree is rooted here, innermost first.
	pub(crate) components: Vec<ComponentRef>,
}

impl VNode {
	fn with_content(content: Content) -> Self {
		Self {
			content,
			attributes: HashMap::new(),
			events: HashMap::new(),
			children: Vec::new(),
			key: None,
			style: None,
			binding: None,
			components: Vec::new(),
		}
	}

	/// An element node. Tag names are compared verbatim, so keep their casing consistent.
	pub fn element(tag: impl Into<Cow<'static, str>>) -> Self {
		Self::with_content(Content::Element(tag.into()))
	}

	pub fn text(text: impl Into<String>) -> Self {
		Self::with_content(Content::Text(text.into()))
	}

	/// A reference to a mounted component, expanded into its render output before patching.
	#[must_use]
	pub fn component(component: ComponentRef) -> Self {
		Self::with_content(Content::Component(component))
	}

	#[must_use]
	pub fn kind(&self) -> NodeKind {
		match self.content {
			Content::Element(_) => NodeKind::Element,
			Content::Text(_) => NodeKind::Text,
			Content::Component(_) => NodeKind::Component,
		}
	}

	/// The tag name, for elements.
	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		match &self.content {
			Content::Element(tag) => Some(tag),
			_ => None,
		}
	}

	/// The text content, for text nodes.
	#[must_use]
	pub fn text_content(&self) -> Option<&str> {
		match &self.content {
			Content::Text(text) => Some(text),
			_ => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, name: &AttrName) -> Option<&AttrValue> {
		self.attributes.get(name)
	}

	pub fn attributes(&self) -> impl Iterator<Item = (&AttrName, &AttrValue)> {
		self.attributes.iter()
	}

	#[must_use]
	pub fn has_handler(&self, kind: &EventKind) -> bool {
		self.events.contains_key(kind)
	}

	#[must_use]
	pub fn child_nodes(&self) -> &[VNode] {
		&self.children
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.key.as_deref()
	}

	#[must_use]
	pub fn applied_style(&self) -> Option<&Rc<dyn Stylesheet>> {
		self.style.as_ref()
	}

	/// The live node this VNode was materialized as or carried forward onto, if any yet.
	#[must_use]
	pub fn dom_handle(&self) -> Option<NodeKey> {
		self.binding.as_ref().map(|binding| binding.node)
	}

	/// Components rooted at this node, innermost first.
	pub fn bound_components(&self) -> impl Iterator<Item = ComponentId> + '_ {
		self.components.iter().map(ComponentRef::id)
	}

	/// Whether no component references remain anywhere in this tree.
	#[must_use]
	pub fn is_expanded(&self) -> bool {
		!matches!(self.content, Content::Component(_)) && self.children.iter().all(VNode::is_expanded)
	}

	/// Sets an attribute, replacing any previous value under the same name.
	#[must_use]
	pub fn attr(mut self, name: impl Into<AttrName>, value: impl Into<AttrValue>) -> Self {
		self.attributes.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn id(self, id: impl Into<AttrValue>) -> Self {
		self.attr(AttrName::Id, id)
	}

	#[must_use]
	pub fn class(self, class: impl Into<AttrValue>) -> Self {
		self.attr(AttrName::Class, class)
	}

	/// Binds a handler. At most one handler exists per event name; the last one wins.
	#[must_use]
	pub fn on(mut self, kind: impl Into<EventKind>, handler: impl Fn(&Event) + 'static) -> Self {
		self.events.insert(kind.into(), Rc::new(handler));
		self
	}

	#[must_use]
	pub fn on_mouse(self, kind: impl Into<EventKind>, handler: impl Fn(&MouseEvent) + 'static) -> Self {
		self.on(kind, move |event| handler(&MouseEvent::from(event.clone())))
	}

	#[must_use]
	pub fn on_click(self, handler: impl Fn(&MouseEvent) + 'static) -> Self {
		self.on_mouse(EventKind::Click, handler)
	}

	#[must_use]
	pub fn on_input(self, handler: impl Fn(&InputEvent) + 'static) -> Self {
		self.on(EventKind::Input, move |event| handler(&InputEvent::from(event.clone())))
	}

	#[must_use]
	pub fn on_change(self, handler: impl Fn(&InputEvent) + 'static) -> Self {
		self.on(EventKind::Change, move |event| handler(&InputEvent::from(event.clone())))
	}

	#[must_use]
	pub fn on_key_down(self, handler: impl Fn(&KeyboardEvent) + 'static) -> Self {
		self.on(EventKind::KeyDown, move |event| handler(&KeyboardEvent::from(event.clone())))
	}

	#[must_use]
	pub fn on_key_up(self, handler: impl Fn(&KeyboardEvent) + 'static) -> Self {
		self.on(EventKind::KeyUp, move |event| handler(&KeyboardEvent::from(event.clone())))
	}

	#[must_use]
	pub fn on_focus(self, handler: impl Fn(&FocusEvent) + 'static) -> Self {
		self.on(EventKind::Focus, move |event| handler(&FocusEvent::from(event.clone())))
	}

	#[must_use]
	pub fn on_blur(self, handler: impl Fn(&FocusEvent) + 'static) -> Self {
		self.on(EventKind::Blur, move |event| handler(&FocusEvent::from(event.clone())))
	}

	#[must_use]
	pub fn child(mut self, child: VNode) -> Self {
		self.children.push(child);
		self
	}

	#[must_use]
	pub fn children(mut self, children: impl IntoIterator<Item = VNode>) -> Self {
		self.children.extend(children);
		self
	}

	/// Appends `child` only if it is `Some`.
	///
	/// Note that children are reconciled by position, so toggling a child in the middle of a list
	/// re-renders every sibling after it.
	#[must_use]
	pub fn child_if(self, child: Option<VNode>) -> Self {
		match child {
			Some(child) => self.child(child),
			None => self,
		}
	}

	/// Applies a stylesheet class. Styles are compared by reference, not by content.
	#[must_use]
	pub fn style<S: Stylesheet + 'static>(mut self, style: Rc<S>) -> Self {
		self.style = Some(style);
		self
	}

	#[must_use]
	pub fn with_style(mut self, style: Option<Rc<dyn Stylesheet>>) -> Self {
		self.style = style;
		self
	}

	/// Records a key. Children are still matched by position; the key is carried but not used for reordering.
	#[must_use]
	pub fn keyed(mut self, key: impl Into<String>) -> Self {
		self.key = Some(key.into());
		self
	}
}

impl Clone for VNode {
	fn clone(&self) -> Self {
		Self {
			content: match &self.content {
				Content::Element(tag) => Content::Element(tag.clone()),
				Content::Text(text) => Content::Text(text.clone()),
				Content::Component(component) => Content::Component(component.clone()),
			},
			attributes: self.attributes.clone(),
			events: self.events.clone(),
			children: self.children.clone(),
			key: self.key.clone(),
			style: self.style.clone(),
			binding: None,
			components: self.components.clone(),
		}
	}
}

impl fmt::Debug for VNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("VNode");
		match &self.content {
			Content::Element(tag) => debug.field("tag", tag),
			Content::Text(text) => {
				if cfg!(feature = "dangerous-logging") {
					debug.field("text", text)
				} else {
					debug.field("text.len()", &text.len())
				}
			}
			Content::Component(component) => debug.field("component", &component.id()),
		};
		if !self.attributes.is_empty() {
			debug.field("attributes", &self.attributes.keys().map(AttrName::as_str).collect::<Vec<_>>());
		}
		if !self.events.is_empty() {
			debug.field("events", &self.events.keys().map(EventKind::as_str).collect::<Vec<_>>());
		}
		if let Some(key) = &self.key {
			debug.field("key", key);
		}
		if let Some(style) = &self.style {
			debug.field("style", &style.class_name());
		}
		debug
			.field("dom_handle", &self.dom_handle())
			.field("components", &self.bound_components().collect::<Vec<_>>())
			.field("children", &self.children)
			.finish()
	}
}
