//! Events as seen by handlers.
//!
//! Hosts hand over whatever they received natively as a [`RawEvent`].
//! [`Event`] adds the node the listener was attached to, and the typed wrappers
//! ([`MouseEvent`], [`KeyboardEvent`], [`InputEvent`], [`FocusEvent`]) add named accessors on top.

use crate::{host::NodeKey, vnode::EventKind};
use core::{any::Any, fmt, num::ParseFloatError, num::ParseIntError, ops::Deref};
use std::rc::Rc;

/// Shared event handler.
pub type Callback = Rc<dyn Fn(&Event)>;

/// Host-neutral view of a native event payload.
///
/// Property names are the DOM's (`"clientX"`, `"key"`, …).
pub trait RawEvent: 'static {
	fn event_type(&self) -> String;
	fn bubbles(&self) -> bool;
	fn cancelable(&self) -> bool;
	fn time_stamp(&self) -> f64;

	fn prevent_default(&self);
	fn default_prevented(&self) -> bool;
	fn stop_propagation(&self);
	fn stop_immediate_propagation(&self);

	/// Reads a numeric property of the event itself.
	fn number(&self, property: &str) -> Option<f64>;
	/// Reads a boolean property of the event itself.
	fn flag(&self, property: &str) -> Option<bool>;
	/// Reads a string property of the event itself.
	fn string(&self, property: &str) -> Option<String>;
	/// Whether a property of the event itself is set to anything but `null`/`undefined`.
	fn present(&self, property: &str) -> bool;

	/// Reads a string property of the event's target, like an `<input>`'s `value`.
	fn target_string(&self, property: &str) -> Option<String>;
	/// Reads a boolean property of the event's target, like a checkbox's `checked`.
	fn target_flag(&self, property: &str) -> Option<bool>;

	fn as_any(&self) -> &dyn Any;
}

/// A dispatched event, as passed to every handler.
#[derive(Clone)]
pub struct Event {
	raw: Rc<dyn RawEvent>,
	current_target: NodeKey,
	target: Option<NodeKey>,
}

impl fmt::Debug for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Event")
			.field("type", &self.raw.event_type())
			.field("current_target", &self.current_target)
			.field("target", &self.target)
			.finish()
	}
}

impl Event {
	#[must_use]
	pub fn new(raw: Rc<dyn RawEvent>, current_target: NodeKey) -> Self {
		Self {
			raw,
			current_target,
			target: None,
		}
	}

	/// Records the node the event was dispatched at.
	#[must_use]
	pub fn with_target(mut self, target: NodeKey) -> Self {
		self.target = Some(target);
		self
	}

	/// The native payload, if it is a `T`.
	///
	/// With [`WebHost`](`crate::host::web::WebHost`), `T` is [`web_sys::Event`].
	#[must_use]
	pub fn raw<T: 'static>(&self) -> Option<&T> {
		self.raw.as_any().downcast_ref()
	}

	#[must_use]
	pub fn raw_event(&self) -> &dyn RawEvent {
		&*self.raw
	}

	/// Handle of the node whose listener is running.
	#[must_use]
	pub fn current_target(&self) -> NodeKey {
		self.current_target
	}

	/// Handle of the node the event was dispatched at, if the host could tell.
	///
	/// [`WebHost`](`crate::host::web::WebHost`) only knows it while the event is at its target.
	#[must_use]
	pub fn target(&self) -> Option<NodeKey> {
		self.target
	}

	#[must_use]
	pub fn event_type(&self) -> String {
		self.raw.event_type()
	}

	#[must_use]
	pub fn bubbles(&self) -> bool {
		self.raw.bubbles()
	}

	#[must_use]
	pub fn cancelable(&self) -> bool {
		self.raw.cancelable()
	}

	#[must_use]
	pub fn time_stamp(&self) -> f64 {
		self.raw.time_stamp()
	}

	pub fn prevent_default(&self) {
		self.raw.prevent_default()
	}

	#[must_use]
	pub fn default_prevented(&self) -> bool {
		self.raw.default_prevented()
	}

	pub fn stop_propagation(&self) {
		self.raw.stop_propagation()
	}

	pub fn stop_immediate_propagation(&self) {
		self.raw.stop_immediate_propagation()
	}

	/// Wraps this event in the typed variant matching `kind`.
	#[must_use]
	pub fn classify(self, kind: &EventKind) -> TypedEvent {
		match kind {
			EventKind::Input | EventKind::Change => TypedEvent::Input(InputEvent(self)),
			EventKind::Click | EventKind::DblClick | EventKind::MouseDown | EventKind::MouseUp | EventKind::MouseOver | EventKind::MouseOut | EventKind::MouseMove => {
				TypedEvent::Mouse(MouseEvent(self))
			}
			EventKind::KeyDown | EventKind::KeyUp | EventKind::KeyPress => TypedEvent::Keyboard(KeyboardEvent(self)),
			EventKind::Focus | EventKind::Blur => TypedEvent::Focus(FocusEvent(self)),
			EventKind::Submit | EventKind::Custom(_) => TypedEvent::Base(self),
		}
	}
}

/// An [`Event`] narrowed by its name.
#[derive(Debug, Clone)]
pub enum TypedEvent {
	Base(Event),
	Mouse(MouseEvent),
	Keyboard(KeyboardEvent),
	Input(InputEvent),
	Focus(FocusEvent),
}

macro_rules! typed_event {
	($($(#[$attr:meta])* $name:ident),+ $(,)?) => {$(
		$(#[$attr])*
		#[derive(Debug, Clone)]
		pub struct $name(Event);

		impl Deref for $name {
			type Target = Event;

			fn deref(&self) -> &Event {
				&self.0
			}
		}

		impl From<Event> for $name {
			fn from(event: Event) -> Self {
				Self(event)
			}
		}

		impl From<$name> for Event {
			fn from(typed: $name) -> Self {
				typed.0
			}
		}
	)+};
}

typed_event! {
	/// `click`, `dblclick`, `mousedown`, `mouseup`, `mouseover`, `mouseout`, `mousemove`.
	MouseEvent,
	/// `keydown`, `keyup`, `keypress`.
	KeyboardEvent,
	/// `input` and `change`.
	InputEvent,
	/// `focus` and `blur`.
	FocusEvent,
}

impl MouseEvent {
	#[allow(clippy::cast_possible_truncation)]
	fn int(&self, property: &str) -> i32 {
		self.raw.number(property).map_or(0, |n| n as i32)
	}

	#[must_use]
	pub fn client_x(&self) -> i32 {
		self.int("clientX")
	}

	#[must_use]
	pub fn client_y(&self) -> i32 {
		self.int("clientY")
	}

	#[must_use]
	pub fn page_x(&self) -> i32 {
		self.int("pageX")
	}

	#[must_use]
	pub fn page_y(&self) -> i32 {
		self.int("pageY")
	}

	#[must_use]
	pub fn screen_x(&self) -> i32 {
		self.int("screenX")
	}

	#[must_use]
	pub fn screen_y(&self) -> i32 {
		self.int("screenY")
	}

	#[must_use]
	pub fn button(&self) -> i32 {
		self.int("button")
	}

	#[must_use]
	pub fn buttons(&self) -> i32 {
		self.int("buttons")
	}

	#[must_use]
	pub fn ctrl_key(&self) -> bool {
		self.raw.flag("ctrlKey").unwrap_or(false)
	}

	#[must_use]
	pub fn shift_key(&self) -> bool {
		self.raw.flag("shiftKey").unwrap_or(false)
	}

	#[must_use]
	pub fn alt_key(&self) -> bool {
		self.raw.flag("altKey").unwrap_or(false)
	}

	#[must_use]
	pub fn meta_key(&self) -> bool {
		self.raw.flag("metaKey").unwrap_or(false)
	}
}

impl KeyboardEvent {
	#[must_use]
	pub fn key(&self) -> String {
		self.raw.string("key").unwrap_or_default()
	}

	#[must_use]
	pub fn code(&self) -> String {
		self.raw.string("code").unwrap_or_default()
	}

	#[must_use]
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	pub fn key_code(&self) -> u32 {
		self.raw.number("keyCode").map_or(0, |n| n as u32)
	}

	#[must_use]
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	pub fn char_code(&self) -> u32 {
		self.raw.number("charCode").map_or(0, |n| n as u32)
	}

	#[must_use]
	pub fn ctrl_key(&self) -> bool {
		self.raw.flag("ctrlKey").unwrap_or(false)
	}

	#[must_use]
	pub fn shift_key(&self) -> bool {
		self.raw.flag("shiftKey").unwrap_or(false)
	}

	#[must_use]
	pub fn alt_key(&self) -> bool {
		self.raw.flag("altKey").unwrap_or(false)
	}

	#[must_use]
	pub fn meta_key(&self) -> bool {
		self.raw.flag("metaKey").unwrap_or(false)
	}

	#[must_use]
	pub fn repeat(&self) -> bool {
		self.raw.flag("repeat").unwrap_or(false)
	}
}

impl InputEvent {
	/// The target's current `value`, or an empty string for targets without one.
	#[must_use]
	pub fn value(&self) -> String {
		self.raw.target_string("value").unwrap_or_default()
	}

	/// # Errors
	///
	/// Iff [`value`](`InputEvent::value`) isn't a valid integer.
	pub fn value_as_int(&self) -> Result<i64, ParseIntError> {
		self.value().trim().parse()
	}

	/// # Errors
	///
	/// Iff [`value`](`InputEvent::value`) isn't a valid number.
	pub fn value_as_float(&self) -> Result<f64, ParseFloatError> {
		self.value().trim().parse()
	}

	#[must_use]
	pub fn checked(&self) -> bool {
		self.raw.target_flag("checked").unwrap_or(false)
	}
}

impl FocusEvent {
	/// Whether the event carries a `relatedTarget` (the element losing or gaining focus in exchange).
	#[must_use]
	pub fn has_related_target(&self) -> bool {
		self.raw.present("relatedTarget")
	}
}
