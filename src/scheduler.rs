//! Invalidation bookkeeping.
//!
//! A [`Context`] is created by each [`Renderer`](`crate::Renderer`) and handed to every component it constructs.
//! Invalidating a component only records it here and requests one animation frame;
//! the renderer's frame callback then takes the dirty set and re-renders the [dirty roots](`Context::dirty_roots`).

use crate::{component::AnyComponent, error::Result};
use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::HashSet;
use slotmap::{new_key_type, SlotMap};
use std::rc::{Rc, Weak};
use tracing::{debug, error, trace};

new_key_type! {
	/// Arena handle of a constructed component.
	pub struct ComponentId;
}

struct Slot {
	component: Weak<dyn AnyComponent>,
	/// The component whose render output references this one, as of the last expansion.
	parent: Option<ComponentId>,
}

pub(crate) type Schedule = Rc<dyn Fn() -> Result<()>>;

#[derive(Default)]
struct Inner {
	registry: RefCell<SlotMap<ComponentId, Slot>>,
	dirty: RefCell<HashSet<ComponentId>>,
	frame_pending: Cell<bool>,
	schedule: RefCell<Option<Schedule>>,
}

/// Component arena, dirty set and pending-frame flag of one renderer.
///
/// Cloning is cheap and yields a handle to the same context.
/// The arena only holds weak references: Components live as long as a [`Handle`](`crate::component::Handle`)
/// or a rendered tree refers to them.
#[derive(Clone, Default)]
pub struct Context(Rc<Inner>);

impl fmt::Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("components", &self.0.registry.borrow().len())
			.field("dirty", &self.0.dirty.borrow().len())
			.field("frame_pending", &self.0.frame_pending.get())
			.finish()
	}
}

impl Context {
	/// A context that isn't attached to any renderer yet.
	///
	/// Invalidations are still recorded, but no frame is requested until a renderer [attaches](`Context::attach`).
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn attach(&self, schedule: Schedule) {
		*self.0.schedule.borrow_mut() = Some(schedule);
		if !self.0.dirty.borrow().is_empty() {
			self.request_frame();
		}
	}

	pub(crate) fn register(&self, component: Weak<dyn AnyComponent>) -> ComponentId {
		self.0.registry.borrow_mut().insert(Slot { component, parent: None })
	}

	/// Marks a component dirty and requests a frame unless one is pending already.
	///
	/// Never renders synchronously. Invalidating a component that was dropped is a no-op.
	pub fn invalidate(&self, id: ComponentId) {
		let component = self.0.registry.borrow().get(id).and_then(|slot| slot.component.upgrade());
		match component {
			Some(component) => component.mark_dirty(),
			None => {
				// Either still under construction (and dirty anyway) or gone.
				if !self.0.registry.borrow().contains_key(id) {
					return debug!("Ignoring invalidation of dropped component {:?}.", id);
				}
			}
		}

		let newly_dirty = self.0.dirty.borrow_mut().insert(id);
		trace!(?id, newly_dirty, "Invalidated.");
		if !self.0.frame_pending.get() {
			self.request_frame();
		}
	}

	fn request_frame(&self) {
		let schedule = self.0.schedule.borrow().clone();
		match schedule {
			Some(schedule) => {
				self.0.frame_pending.set(true);
				if let Err(error) = schedule() {
					error!("Failed to request an animation frame: {}", error);
					self.0.frame_pending.set(false);
				}
			}
			None => trace!("No renderer attached yet; not requesting a frame."),
		}
	}

	#[must_use]
	pub fn frame_pending(&self) -> bool {
		self.0.frame_pending.get()
	}

	#[must_use]
	pub fn is_dirty(&self, id: ComponentId) -> bool {
		self.0.dirty.borrow().contains(&id)
	}

	#[must_use]
	pub fn dirty_count(&self) -> usize {
		self.0.dirty.borrow().len()
	}

	/// How many components are registered, including ones dropped since the last flush.
	#[must_use]
	pub fn component_count(&self) -> usize {
		self.0.registry.borrow().len()
	}

	/// Clears the pending-frame flag and hands out the dirty set.
	pub(crate) fn take_dirty(&self) -> HashSet<ComponentId> {
		self.0.frame_pending.set(false);
		core::mem::take(&mut *self.0.dirty.borrow_mut())
	}

	/// Forgets dropped components.
	pub(crate) fn purge(&self) -> usize {
		let mut registry = self.0.registry.borrow_mut();
		let before = registry.len();
		registry.retain(|_, slot| slot.component.strong_count() > 0);
		before - registry.len()
	}

	pub(crate) fn upgrade(&self, id: ComponentId) -> Option<Rc<dyn AnyComponent>> {
		self.0.registry.borrow().get(id)?.component.upgrade()
	}

	pub(crate) fn set_parent(&self, id: ComponentId, parent: Option<ComponentId>) {
		if let Some(slot) = self.0.registry.borrow_mut().get_mut(id) {
			slot.parent = parent;
		}
	}

	#[must_use]
	pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
		self.0.registry.borrow().get(id)?.parent
	}

	/// Reduces `dirty` to the components that have no dirty ancestor.
	///
	/// A dirty ancestor re-renders its whole subtree anyway, which covers the descendant.
	/// The result is sorted so that flushes are reproducible.
	#[must_use]
	pub fn dirty_roots(&self, dirty: &HashSet<ComponentId>) -> Vec<ComponentId> {
		let registry = self.0.registry.borrow();
		let mut roots: Vec<ComponentId> = dirty
			.iter()
			.copied()
			.filter(|&id| {
				let mut current = registry.get(id).and_then(|slot| slot.parent);
				// Bounded in case a stale link ever forms a loop.
				for _ in 0..registry.len() {
					match current {
						Some(ancestor) if ancestor == id => break,
						Some(ancestor) if dirty.contains(&ancestor) => return false,
						Some(ancestor) => current = registry.get(ancestor).and_then(|slot| slot.parent),
						None => break,
					}
				}
				true
			})
			.collect();
		roots.sort_unstable();
		roots
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vnode::VNode;
	use pretty_assertions::assert_eq;

	fn set(ids: &[ComponentId]) -> HashSet<ComponentId> {
		ids.iter().copied().collect()
	}

	#[test]
	fn ancestors_subsume_descendants() {
		let context = Context::new();
		let a = context.stateless(|| VNode::text("a"));
		let b = context.stateless(|| VNode::text("b"));
		let c = context.stateless(|| VNode::text("c"));
		let d = context.stateless(|| VNode::text("d"));
		// a ─ b ─ c, d unrelated.
		context.set_parent(b.id(), Some(a.id()));
		context.set_parent(c.id(), Some(b.id()));

		let mut expected = vec![a.id(), d.id()];
		expected.sort_unstable();
		assert_eq!(context.dirty_roots(&set(&[a.id(), c.id(), d.id()])), expected);
		assert_eq!(context.dirty_roots(&set(&[b.id(), c.id()])), vec![b.id()]);
		assert_eq!(context.dirty_roots(&set(&[c.id()])), vec![c.id()]);
	}

	#[test]
	fn loops_terminate() {
		let context = Context::new();
		let a = context.stateless(|| VNode::text("a"));
		let b = context.stateless(|| VNode::text("b"));
		context.set_parent(a.id(), Some(b.id()));
		context.set_parent(b.id(), Some(a.id()));
		assert_eq!(context.dirty_roots(&set(&[a.id()])), vec![a.id()]);
	}

	#[test]
	fn unattached_context_records_without_frames() {
		let context = Context::new();
		let a = context.stateless(|| VNode::text("a"));
		a.invalidate();
		assert!(context.is_dirty(a.id()));
		assert!(!context.frame_pending());

		let requested = Rc::new(Cell::new(0));
		{
			let requested = Rc::clone(&requested);
			context.attach(Rc::new(move || -> Result<()> {
				requested.set(requested.get() + 1);
				Ok(())
			}));
		}
		assert_eq!(requested.get(), 1);
		assert!(context.frame_pending());

		a.invalidate();
		assert_eq!(requested.get(), 1);

		assert_eq!(context.take_dirty(), set(&[a.id()]));
		assert!(!context.frame_pending());
	}

	#[test]
	fn dropped_components_are_purged() {
		let context = Context::new();
		let a = context.stateless(|| VNode::text("a"));
		let id = a.id();
		drop(a);
		assert_eq!(context.component_count(), 1);
		assert_eq!(context.purge(), 1);
		assert_eq!(context.component_count(), 0);
		context.invalidate(id);
		assert!(!context.is_dirty(id));
	}
}
