//! The reconciler: Patches a live DOM subtree from one [`VNode`] generation to the next.
//!
//! Children are matched by position only. Inserting or removing a child in the middle of a list
//! therefore updates or replaces every sibling after it.

use crate::{
	component::ComponentRef,
	error::{Error, Result},
	event::{Callback, Event},
	host::{Handler, Host, NodeKey},
	style::{merge_class_tokens, StyleInjector, Stylesheet},
	vnode::{AttrName, AttrValue, Binding, Content, EventKind, Listener, VNode},
};
use core::{cell::RefCell, mem, ptr};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Lifecycle hooks collected during a patch, to be run once no tree is borrowed anymore.
#[derive(Debug, Default)]
#[must_use = "Lifecycle hooks are only invoked by `Lifecycle::run`."]
pub struct Lifecycle {
	mounted: Vec<ComponentRef>,
	unmounted: Vec<ComponentRef>,
}

impl Lifecycle {
	/// Runs all `unmounted` hooks, then all `mounted` hooks.
	pub fn run(self) {
		for component in self.unmounted {
			trace!(id = ?component.id(), "unmounted");
			component.0.unmounted();
		}
		for component in self.mounted {
			trace!(id = ?component.id(), "mounted");
			component.0.mounted();
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.mounted.is_empty() && self.unmounted.is_empty()
	}

	pub(crate) fn extend(&mut self, other: Lifecycle) {
		self.mounted.extend(other.mounted);
		self.unmounted.extend(other.unmounted);
	}
}

/// Applies [`VNode`] diffs to a [`Host`].
///
/// # Contract
///
/// - The tree passed in as `live` must be the one that was last patched into the same position, with its DOM bindings intact.
///   Its bindings are carried forward onto `next` where nodes are updated in place.
/// - Both trees must be fully expanded (see [`VNode::is_expanded`]).
///
/// Violating either is a bug in the caller and panics.
///
/// Host failures are returned as they are and leave the DOM partially patched,
/// but `live` always ends up describing what is in place, so the next patch can start from it.
pub struct Reconciler<'a, H: Host + ?Sized> {
	host: &'a H,
	styles: &'a mut StyleInjector,
	depth_limit: usize,
	lifecycle: Lifecycle,
}

impl<'a, H: Host + ?Sized> Reconciler<'a, H> {
	pub fn new(host: &'a H, styles: &'a mut StyleInjector, depth_limit: usize) -> Self {
		Self {
			host,
			styles,
			depth_limit,
			lifecycle: Lifecycle::default(),
		}
	}

	/// Makes the DOM under `parent` that currently reflects `live` reflect `next` instead, then stores the bound `next` in `live`.
	///
	/// - Only `next`: `next` is created and appended to `parent`.
	/// - Only `live`: `live`'s node is removed from `parent`.
	/// - Neither: Nothing happens.
	/// - Different kinds or tags: `next` is created from scratch and replaces `live`'s node.
	/// - Otherwise, `live`'s node is updated in place and bound to `next`.
	///
	/// If this fails, `live` holds whatever tree reflects the DOM at that position instead:
	/// Nodes that were updated are bound to their `next` counterparts, nodes that weren't reached keep their previous generation,
	/// and nodes that failed to be created are released again.
	/// `live` is only emptied if `next` is `None` or `live` was empty to begin with.
	///
	/// # Errors
	///
	/// Iff a host operation fails or the trees are nested deeper than the depth limit.
	#[instrument(skip(self, live, next))]
	pub fn patch(&mut self, parent: NodeKey, live: &mut Option<VNode>, next: Option<VNode>) -> Result<()> {
		self.patch_node(parent, live, next, self.depth_limit)
	}

	/// Ends this patch and hands out the collected lifecycle hooks.
	///
	/// These match `live` after the patch, whether it succeeded or not.
	pub fn finish(self) -> Lifecycle {
		self.lifecycle
	}

	fn patch_node(&mut self, parent: NodeKey, live: &mut Option<VNode>, next: Option<VNode>, depth_limit: usize) -> Result<()> {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return Err(Error::DepthLimit);
		}

		let mut next = match next {
			Some(next) => next,
			None => {
				let previous = match live {
					Some(previous) => previous,
					None => return Ok(()),
				};
				let span = trace_span!("Deleting", kind = ?previous.kind(), tag = previous.tag());
				let _enter = span.enter();
				self.host.remove_child(parent, bound_node(previous))?;
				if let Some(previous) = live.take() {
					self.release(previous, depth_limit);
				}
				return Ok(());
			}
		};

		match live.take() {
			None => {
				let span = trace_span!("Creating", kind = ?next.kind(), tag = next.tag());
				let _enter = span.enter();
				if STATIC_MAX_LEVEL >= Level::WARN && next.binding.is_some() {
					warn!("Creating from a VNode that is already bound. Its previous binding is discarded without being released.");
				}
				let mounted = self.lifecycle.mounted.len();
				match self.materialize(&mut next, depth_limit).and_then(|node| self.host.append_child(parent, node)) {
					Ok(()) => {
						*live = Some(next);
						Ok(())
					}
					Err(error) => {
						self.discard(next, mounted);
						Err(error)
					}
				}
			}

			Some(previous) if previous.kind() != next.kind() || previous.tag() != next.tag() => {
				let span = trace_span!("Replacing", from = ?previous.kind(), to = ?next.kind(), from_tag = previous.tag(), to_tag = next.tag());
				let _enter = span.enter();
				let old = bound_node(&previous);
				let mounted = self.lifecycle.mounted.len();
				match self.materialize(&mut next, depth_limit).and_then(|new| self.host.replace_child(parent, new, old)) {
					Ok(()) => {
						self.release(previous, depth_limit);
						*live = Some(next);
						Ok(())
					}
					Err(error) => {
						self.discard(next, mounted);
						*live = Some(previous);
						Err(error)
					}
				}
			}

			Some(previous) => {
				let (updated, result) = self.update(previous, next, depth_limit);
				*live = Some(updated);
				result
			}
		}
	}

	/// Creates the live counterpart of `next`, binding every node along the way.
	/// The returned node isn't attached to anything yet.
	///
	/// On failure, whatever was bound so far stays bound for [`discard`](`Reconciler::discard`) to release.
	fn materialize(&mut self, next: &mut VNode, depth_limit: usize) -> Result<NodeKey> {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return Err(Error::DepthLimit);
		}

		let node = match &next.content {
			Content::Text(text) => {
				let node = self.host.create_text(text)?;
				next.binding = Some(Binding {
					node,
					listeners: HashMap::new(),
				});
				node
			}

			Content::Element(tag) => {
				let node = self.host.create_element(tag)?;
				next.binding = Some(Binding {
					node,
					listeners: HashMap::new(),
				});

				for (name, value) in &next.attributes {
					if *name != AttrName::Class {
						self.host.set_attribute(node, name.as_str(), &value.to_string())?;
					}
				}
				self.update_class(node, None, next)?;

				let mut listeners = HashMap::with_capacity(next.events.len());
				for (kind, callback) in &next.events {
					listeners.insert(kind.clone(), self.listen(node, kind, callback)?);
				}
				next.binding = Some(Binding { node, listeners });

				for child in &mut next.children {
					let child_node = self.materialize(child, depth_limit - 1)?;
					self.host.append_child(node, child_node)?;
				}
				node
			}

			Content::Component(component) => unexpanded(component),
		};

		self.lifecycle.mounted.extend(next.components.iter().cloned());
		Ok(node)
	}

	/// Updates `previous`'s node in place and returns `next` bound to it.
	///
	/// The binding is moved over before anything can fail.
	/// If a child fails, the children after it keep their previous generation.
	fn update(&mut self, previous: VNode, mut next: VNode, depth_limit: usize) -> (VNode, Result<()>) {
		let VNode {
			content: previous_content,
			attributes: previous_attributes,
			children: previous_children,
			style: previous_style,
			binding: previous_binding,
			components: previous_components,
			..
		} = previous;
		let mut binding = previous_binding.unwrap_or_else(|| unbound(&next));
		let node = binding.node;

		// A parent may swap one component for another that renders the same element.
		for component in &previous_components {
			if !next.components.contains(component) {
				self.lifecycle.unmounted.push(component.clone());
			}
		}
		for component in &next.components {
			if !previous_components.contains(component) {
				self.lifecycle.mounted.push(component.clone());
			}
		}

		let result = match (&previous_content, &next.content) {
			(Content::Text(previous_text), Content::Text(next_text)) => {
				let span = if cfg!(feature = "dangerous-logging") {
					trace_span!("Updating text", ?node, previous_text = previous_text.as_str(), next_text = next_text.as_str())
				} else {
					trace_span!("Updating text", ?node)
				};
				let _enter = span.enter();
				if previous_text == next_text {
					trace!("Text unchanged.");
					Ok(())
				} else {
					self.host.set_text(node, next_text)
				}
			}

			(Content::Element(tag), Content::Element(_)) => {
				let span = trace_span!("Updating element", ?node, tag = &**tag);
				let _enter = span.enter();

				let result = self.update_element(node, &previous_attributes, previous_style.as_ref(), &mut binding.listeners, &next);
				let next_children = mem::take(&mut next.children);
				let (children, result) = self.update_children(node, previous_children, next_children, result, depth_limit);
				next.children = children;
				result
			}

			(Content::Component(component), _) | (_, Content::Component(component)) => unexpanded(component),
			(Content::Text(_), Content::Element(_)) | (Content::Element(_), Content::Text(_)) => {
				unreachable!("vortex-dom bug: Kind mismatch should have been replaced")
			}
		};

		if result.is_err() && matches!(next.content, Content::Text(_)) {
			// The write didn't happen.
			next.content = previous_content;
		}
		next.binding = Some(binding);
		(next, result)
	}

	fn update_element(
		&mut self,
		node: NodeKey,
		previous_attributes: &HashMap<AttrName, AttrValue>,
		previous_style: Option<&Rc<dyn Stylesheet>>,
		listeners: &mut HashMap<EventKind, Listener>,
		next: &VNode,
	) -> Result<()> {
		for name in previous_attributes.keys() {
			if *name != AttrName::Class && !next.attributes.contains_key(name) {
				self.host.remove_attribute(node, name.as_str())?;
			}
		}
		for (name, value) in &next.attributes {
			if *name == AttrName::Class {
				continue;
			}
			let value = value.to_string();
			match previous_attributes.get(name) {
				Some(previous) if previous.to_string() == value => {
					if cfg!(feature = "dangerous-logging") {
						trace!(name = name.as_str(), value = value.as_str(), "Attribute unchanged.");
					} else {
						trace!(name = name.as_str(), "Attribute unchanged.");
					}
				}
				_ => self.host.set_attribute(node, name.as_str(), &value)?,
			}
		}

		let previous_class = previous_attributes.get(&AttrName::Class).map(ToString::to_string);
		self.update_class(node, Some((previous_class.as_deref(), previous_style)), next)?;

		self.update_listeners(node, listeners, &next.events)
	}

	/// Patches children pairwise by position and returns the children now in place.
	///
	/// Once `result` is an error, the remaining previous children are kept as they are.
	fn update_children(&mut self, node: NodeKey, previous: Vec<VNode>, next: Vec<VNode>, mut result: Result<()>, depth_limit: usize) -> (Vec<VNode>, Result<()>) {
		let mut live_children = Vec::with_capacity(previous.len().max(next.len()));
		let mut previous = previous.into_iter();
		let mut next = next.into_iter();
		loop {
			let (previous_child, next_child) = match (previous.next(), next.next()) {
				(None, None) => break,
				pair => pair,
			};
			if result.is_err() {
				live_children.extend(previous_child);
				continue;
			}

			let mut live = previous_child;
			result = self.patch_node(node, &mut live, next_child, depth_limit - 1);
			live_children.extend(live);
		}
		(live_children, result)
	}

	/// Reconciles the `class` attribute from the user-supplied class tokens and the stylesheet class.
	///
	/// Tokens neither came from are left alone.
	fn update_class(&mut self, node: NodeKey, previous: Option<(Option<&str>, Option<&Rc<dyn Stylesheet>>)>, next: &VNode) -> Result<()> {
		let next_class = next.attributes.get(&AttrName::Class).map(ToString::to_string);
		let (previous_class, previous_style) = previous.unwrap_or((None, None));

		let same_style = match (previous_style, &next.style) {
			(Some(a), Some(b)) => ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>()),
			(None, None) => true,
			_ => false,
		};
		if same_style && previous_class == next_class.as_deref() {
			return Ok(());
		}

		let previous_style_class = previous_style.map(|style| style.class_name().into_owned());
		let next_style_class = match &next.style {
			Some(style) => Some(self.styles.inject(self.host, &**style)?),
			None => None,
		};

		let remove: Vec<&str> = previous_class
			.into_iter()
			.flat_map(str::split_whitespace)
			.chain(previous_style_class.as_deref())
			.collect();
		let add: Vec<&str> = next_class
			.as_deref()
			.into_iter()
			.flat_map(str::split_whitespace)
			.chain(next_style_class.as_deref())
			.collect();

		let current = if previous.is_some() {
			self.host.attribute(node, "class")?.unwrap_or_default()
		} else {
			String::new()
		};
		let merged = merge_class_tokens(&current, &remove, &add);
		if merged == current {
			trace!("Class unchanged.");
		} else if merged.is_empty() {
			self.host.remove_attribute(node, "class")?;
		} else {
			self.host.set_attribute(node, "class", &merged)?;
		}
		Ok(())
	}

	fn listen(&mut self, node: NodeKey, kind: &EventKind, callback: &Callback) -> Result<Listener> {
		let slot = Rc::new(RefCell::new(Rc::clone(callback)));
		let handler: Handler = {
			let slot = Rc::downgrade(&slot);
			Rc::new(move |event: Event| match slot.upgrade() {
				Some(slot) => {
					// Cloned out so that the callback may re-enter the differ.
					let callback = Rc::clone(&slot.borrow());
					callback(&event);
				}
				None => warn!("Event {:?} on a node whose bindings were released.", event),
			})
		};
		let key = self.host.add_event_listener(node, kind.as_str(), handler)?;
		Ok(Listener { key, slot })
	}

	/// Swaps callbacks of event names bound both before and after, adds and removes listeners for the rest.
	fn update_listeners(&mut self, node: NodeKey, listeners: &mut HashMap<EventKind, Listener>, events: &HashMap<EventKind, Callback>) -> Result<()> {
		for (kind, callback) in events {
			match listeners.get(kind) {
				Some(listener) => *listener.slot.borrow_mut() = Rc::clone(callback),
				None => {
					let listener = self.listen(node, kind, callback)?;
					listeners.insert(kind.clone(), listener);
				}
			}
		}

		let stale: Vec<EventKind> = listeners.keys().filter(|kind| !events.contains_key(*kind)).cloned().collect();
		for kind in stale {
			if let Some(listener) = listeners.remove(&kind) {
				self.host.remove_event_listener(node, listener.key)?;
			}
		}
		Ok(())
	}

	/// Forgets the bindings of a subtree that was removed from the DOM.
	fn release(&mut self, vnode: VNode, depth_limit: usize) {
		if depth_limit == 0 {
			return error!("Depth limit reached while releasing bindings; Leaking the rest of the subtree.");
		}

		let VNode {
			children, binding, components, ..
		} = vnode;
		for child in children {
			self.release(child, depth_limit - 1);
		}
		match binding {
			Some(binding) => self.host.release(binding.node),
			None => warn!("Released a VNode that was never bound."),
		}
		self.lifecycle.unmounted.extend(components);
	}

	/// Releases whatever [`materialize`](`Reconciler::materialize`) bound before it failed.
	/// None of it was ever attached, so its components are forgotten rather than unmounted.
	fn discard(&mut self, vnode: VNode, mounted: usize) {
		trace!("Discarding partially created subtree.");
		self.lifecycle.mounted.truncate(mounted);
		self.forget(vnode);
	}

	fn forget(&self, vnode: VNode) {
		// Children are only bound once their parent is.
		if let Some(binding) = vnode.binding {
			for child in vnode.children {
				self.forget(child);
			}
			self.host.release(binding.node);
		}
	}
}

fn bound_node(vnode: &VNode) -> NodeKey {
	vnode.dom_handle().unwrap_or_else(|| unbound(vnode))
}

#[cold]
fn unbound(vnode: &VNode) -> ! {
	panic!("vortex-dom bug: Expected a DOM binding on {:?}. Was the previous tree patched before?", vnode)
}

#[cold]
fn unexpanded(component: &ComponentRef) -> ! {
	panic!("vortex-dom bug: Component reference {:?} reached the differ unexpanded.", component)
}
