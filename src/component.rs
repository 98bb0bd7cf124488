//! Components: Units that produce a [`VNode`] on demand.
//!
//! Components are constructed through a [`Context`], which registers them for invalidation and hands each one its
//! [`Invalidator`]. The resulting [`Handle`] is compared by identity: Reuse the same handle across renders
//! so that a parent's re-render finds the component again.
//!
//! Three shapes are provided:
//!
//! - [`Stateless`] wraps a render function. Its output is cached until it is explicitly invalidated.
//! - [`Stateful`] owns a [`State<T>`]. Every write through the state invalidates the component.
//! - Composites are plain [`Component`] implementations that keep [`Handle`]s of their children
//!   and reference them through [`Handle::vnode`]. [`Context::mount`] passes the invalidator to their constructor.

use crate::{
	scheduler::{ComponentId, Context},
	vnode::VNode,
};
use core::{
	cell::{Cell, RefCell},
	fmt,
	ops::Deref,
};
use std::rc::{Rc, Weak};
use tracing::trace;

/// A unit of UI.
pub trait Component: 'static {
	/// Describes the current state. Must not mutate state.
	///
	/// The result is cached until the component is invalidated, so this isn't necessarily called once per frame.
	fn render(&self) -> VNode;

	/// Called after the component's subtree has been attached to the live DOM.
	fn mounted(&self) {}

	/// Called after the component's subtree has been removed from the live DOM.
	fn unmounted(&self) {}
}

/// Object-safe view of a [`Mounted`] component, as stored in trees and in the arena.
pub(crate) trait AnyComponent {
	fn id(&self) -> ComponentId;
	/// Renders if dirty, otherwise returns a fresh copy of the cached output.
	fn render_cached(&self) -> VNode;
	fn mark_dirty(&self);
	fn is_dirty(&self) -> bool;
	fn mounted(&self);
	fn unmounted(&self);
}

/// A component together with its registration and render cache.
pub(crate) struct Mounted<C> {
	invalidator: Invalidator,
	dirty: Cell<bool>,
	cache: RefCell<Option<VNode>>,
	component: C,
}

impl<C: Component> AnyComponent for Mounted<C> {
	fn id(&self) -> ComponentId {
		self.invalidator.id
	}

	fn render_cached(&self) -> VNode {
		if !self.dirty.get() {
			if let Some(cached) = &*self.cache.borrow() {
				trace!(id = ?self.invalidator.id, "Reusing cached render.");
				return cached.clone();
			}
		}

		let rendered = self.component.render();
		*self.cache.borrow_mut() = Some(rendered.clone());
		self.dirty.set(false);
		rendered
	}

	fn mark_dirty(&self) {
		self.dirty.set(true);
	}

	fn is_dirty(&self) -> bool {
		self.dirty.get()
	}

	fn mounted(&self) {
		self.component.mounted();
	}

	fn unmounted(&self) {
		self.component.unmounted();
	}
}

/// Owning handle of a constructed component. Clones refer to the same component.
pub struct Handle<C: Component>(Rc<Mounted<C>>);

impl<C: Component> Clone for Handle<C> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<C: Component> Deref for Handle<C> {
	type Target = C;

	fn deref(&self) -> &C {
		&self.0.component
	}
}

impl<C: Component> fmt::Debug for Handle<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Handle")
			.field("id", &self.id())
			.field("dirty", &self.0.dirty.get())
			.finish_non_exhaustive()
	}
}

impl<C: Component> Handle<C> {
	#[must_use]
	pub fn id(&self) -> ComponentId {
		self.0.invalidator.id
	}

	/// A reference to this component, for use as a child in another render output.
	#[must_use]
	pub fn vnode(&self) -> VNode {
		VNode::component(self.component_ref())
	}

	#[must_use]
	pub fn component_ref(&self) -> ComponentRef {
		ComponentRef(Rc::clone(&self.0) as Rc<dyn AnyComponent>)
	}

	/// Drops the cached render output and schedules a re-render.
	pub fn invalidate(&self) {
		self.0.invalidator.invalidate();
	}

	#[must_use]
	pub fn is_dirty(&self) -> bool {
		self.0.dirty.get()
	}

	/// Renders (or reuses the cached output) without touching the DOM.
	///
	/// Nested component references are left as they are.
	#[must_use]
	pub fn render(&self) -> VNode {
		self.0.render_cached()
	}
}

/// Type-erased reference to a component, as stored in [`VNode`]s.
#[derive(Clone)]
pub struct ComponentRef(pub(crate) Rc<dyn AnyComponent>);

impl ComponentRef {
	#[must_use]
	pub fn id(&self) -> ComponentId {
		self.0.id()
	}
}

impl fmt::Debug for ComponentRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ComponentRef").field(&self.id()).finish()
	}
}

impl PartialEq for ComponentRef {
	fn eq(&self, other: &Self) -> bool {
		self.id() == other.id()
	}
}
impl Eq for ComponentRef {}

/// Schedules re-renders of one component. Handed to components at construction.
#[derive(Clone)]
pub struct Invalidator {
	id: ComponentId,
	context: Context,
}

impl fmt::Debug for Invalidator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Invalidator").field(&self.id).finish()
	}
}

impl Invalidator {
	#[must_use]
	pub fn id(&self) -> ComponentId {
		self.id
	}

	#[must_use]
	pub fn context(&self) -> &Context {
		&self.context
	}

	/// Marks the component dirty. The re-render happens on the next frame, together with all other invalidations.
	pub fn invalidate(&self) {
		self.context.invalidate(self.id);
	}
}

/// A render function without state.
pub struct Stateless {
	render: Box<dyn Fn() -> VNode>,
}

impl Component for Stateless {
	fn render(&self) -> VNode {
		(self.render)()
	}
}

/// Component-owned state. Writes replace the whole value and invalidate the owning component.
pub struct State<T> {
	value: Rc<RefCell<T>>,
	invalidator: Invalidator,
}

impl<T> Clone for State<T> {
	fn clone(&self) -> Self {
		Self {
			value: Rc::clone(&self.value),
			invalidator: self.invalidator.clone(),
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("State").field("value", &self.value.borrow()).field("owner", &self.invalidator.id).finish()
	}
}

impl<T> State<T> {
	#[must_use]
	pub fn new(initial: T, invalidator: Invalidator) -> Self {
		Self {
			value: Rc::new(RefCell::new(initial)),
			invalidator,
		}
	}

	#[must_use]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	/// Reads the state without cloning it.
	pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
		read(&self.value.borrow())
	}

	/// Replaces the state and invalidates the owner.
	pub fn set(&self, value: T) {
		*self.value.borrow_mut() = value;
		self.invalidator.invalidate();
	}

	/// Shorthand for `set(update(get()))`.
	pub fn update(&self, update: impl FnOnce(T) -> T)
	where
		T: Clone,
	{
		let next = update(self.get());
		self.set(next);
	}

	/// Changes the state in place and invalidates the owner.
	pub fn modify(&self, modify: impl FnOnce(&mut T)) {
		modify(&mut self.value.borrow_mut());
		self.invalidator.invalidate();
	}
}

/// A component rendering from its own [`State<T>`].
pub struct Stateful<T> {
	state: State<T>,
	render: Box<dyn Fn(&State<T>) -> VNode>,
}

impl<T: 'static> Component for Stateful<T> {
	fn render(&self) -> VNode {
		(self.render)(&self.state)
	}
}

impl<T> Stateful<T> {
	#[must_use]
	pub fn state(&self) -> &State<T> {
		&self.state
	}
}

impl Context {
	/// Constructs and registers a component.
	///
	/// `build` receives the component's [`Invalidator`] and may itself construct child components through this context.
	pub fn mount<C: Component>(&self, build: impl FnOnce(Invalidator) -> C) -> Handle<C> {
		let context = self.clone();
		Handle(Rc::new_cyclic(move |weak: &Weak<Mounted<C>>| {
			let weak: Weak<dyn AnyComponent> = weak.clone();
			let invalidator = Invalidator {
				id: context.register(weak),
				context,
			};
			trace!(id = ?invalidator.id, component = core::any::type_name::<C>(), "Registered component.");
			Mounted {
				component: build(invalidator.clone()),
				invalidator,
				dirty: Cell::new(true),
				cache: RefCell::new(None),
			}
		}))
	}

	/// Registers an already constructed component that doesn't need its invalidator.
	pub fn component<C: Component>(&self, component: C) -> Handle<C> {
		self.mount(|_| component)
	}

	pub fn stateless(&self, render: impl Fn() -> VNode + 'static) -> Handle<Stateless> {
		self.mount(|_| Stateless { render: Box::new(render) })
	}

	pub fn stateful<T: 'static>(&self, initial: T, render: impl Fn(&State<T>) -> VNode + 'static) -> Handle<Stateful<T>> {
		self.mount(|invalidator| Stateful {
			state: State::new(initial, invalidator),
			render: Box::new(render),
		})
	}
}
