//! The mount entry point: Owns a host, the retained tree and the per-frame flush.

use crate::{
	component::ComponentRef,
	diff::{Lifecycle, Reconciler},
	error::Result,
	expand::{expand, node_at, node_at_mut, ComponentIndex},
	host::{web::WebHost, Host, NodeKey},
	scheduler::{ComponentId, Context},
	style::StyleInjector,
	vnode::VNode,
};
use core::{
	cell::{Cell, RefCell},
	fmt, mem,
};
use std::rc::Rc;
use tracing::{debug, error, info, instrument, trace, warn};

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
	/// `id` of the shared `<style>` element styles are injected into. Only used by [`WebHost`].
	pub stylesheet_id: String,
	/// Maximum nesting depth of patched trees and of component expansion.
	pub depth_limit: usize,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			stylesheet_id: "vortex-styles".to_owned(),
			depth_limit: 1024,
		}
	}
}

/// What one [`Renderer::flush`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
	/// Components that were invalidated since the previous flush.
	pub dirty: usize,
	/// Dirty components without a dirty ancestor.
	pub roots: usize,
	/// Roots that were re-rendered and patched.
	pub patched: usize,
	/// Roots that weren't mounted (anymore) and were left alone.
	pub skipped: usize,
	/// Roots whose patch failed. Their DOM may be partially updated.
	pub failed: usize,
	/// Dropped components removed from the arena.
	pub purged: usize,
}

struct Shared<H: Host> {
	host: H,
	container: NodeKey,
	context: Context,
	options: Options,
	tree: RefCell<Option<VNode>>,
	index: RefCell<ComponentIndex>,
	styles: RefCell<StyleInjector>,
	last_flush: Cell<FlushReport>,
	patches: Cell<usize>,
	flushing: Cell<bool>,
}

/// Renders [`VNode`] trees into one container and keeps them up to date as components are invalidated.
///
/// Cloning yields another handle to the same renderer.
/// Component invalidations request an animation frame from the host; the frame [flush](`Renderer::flush`)es
/// every component invalidated until then at once.
pub struct Renderer<H: Host = WebHost> {
	shared: Rc<Shared<H>>,
}

impl<H: Host> Clone for Renderer<H> {
	fn clone(&self) -> Self {
		Self {
			shared: Rc::clone(&self.shared),
		}
	}
}

impl<H: Host> fmt::Debug for Renderer<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Renderer")
			.field("container", &self.shared.container)
			.field("context", &self.shared.context)
			.field("options", &self.shared.options)
			.field("mounted", &self.shared.tree.borrow().is_some())
			.finish_non_exhaustive()
	}
}

impl Renderer<WebHost> {
	/// Mounts into the element with id `container_id` of the current document.
	///
	/// # Errors
	///
	/// Iff there is no document or no such element.
	pub fn new(container_id: &str) -> Result<Self> {
		Self::with_options(container_id, Options::default())
	}

	/// # Errors
	///
	/// Iff there is no document or no such element.
	pub fn with_options(container_id: &str, options: Options) -> Result<Self> {
		let host = WebHost::new(&options.stylesheet_id)?;
		let container = host.mount_point(container_id)?;
		Ok(Self::with_host(host, container, options))
	}
}

impl<H: Host> Renderer<H> {
	/// Renders into `container`, which must be an element handle of `host`.
	#[instrument(skip(host, options))]
	pub fn with_host(host: H, container: NodeKey, options: Options) -> Self {
		let shared = Rc::new(Shared {
			host,
			container,
			context: Context::new(),
			options,
			tree: RefCell::new(None),
			index: RefCell::new(ComponentIndex::default()),
			styles: RefCell::new(StyleInjector::new()),
			last_flush: Cell::new(FlushReport::default()),
			patches: Cell::new(0),
			flushing: Cell::new(false),
		});

		let weak = Rc::downgrade(&shared);
		shared.context.attach(Rc::new(move || -> Result<()> {
			let shared = match weak.upgrade() {
				Some(shared) => shared,
				None => return Ok(trace!("Renderer dropped; not requesting a frame.")),
			};
			let frame = Rc::downgrade(&shared);
			shared.host.request_animation_frame(Box::new(move || match frame.upgrade() {
				Some(shared) => {
					shared.flush();
				}
				None => trace!("Renderer dropped before its frame."),
			}))
		}));

		Self { shared }
	}

	/// Constructs components that re-render through this renderer.
	#[must_use]
	pub fn context(&self) -> &Context {
		&self.shared.context
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.shared.host
	}

	#[must_use]
	pub fn container(&self) -> NodeKey {
		self.shared.container
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.shared.options
	}

	/// Renders `vnode` as the whole content of the container.
	///
	/// The first call creates the DOM. Later calls patch it from the previous tree.
	///
	/// # Errors
	///
	/// Iff expansion or patching fails. The retained tree then describes whatever part of the patch went through,
	/// so the next call patches onward from there.
	#[instrument(skip(self, vnode))]
	pub fn render(&self, vnode: VNode) -> Result<()> {
		self.shared.render(vnode)
	}

	/// Removes the rendered tree from the container.
	///
	/// # Errors
	///
	/// Iff the host fails to remove it. The tree stays retained in that case.
	#[instrument(skip(self))]
	pub fn unmount(&self) -> Result<()> {
		let mut live = self.shared.tree.borrow_mut().take();
		let (lifecycle, result) = self.shared.patch(self.shared.container, &mut live, None);
		self.shared.retain(live);
		lifecycle.run();
		result
	}

	/// Patches an arbitrary position of the host's DOM, outside of the retained tree.
	///
	/// `live` is the tree currently in place under `parent` and is replaced by `next` once bound.
	/// Component references in `next` are expanded first. Shares this renderer's style cache.
	///
	/// # Errors
	///
	/// Iff expansion or a host operation fails.
	/// See [`Reconciler::patch`] for what `live` holds afterwards.
	pub fn patch(&self, parent: NodeKey, live: &mut Option<VNode>, next: Option<VNode>) -> Result<()> {
		let next = match next {
			Some(next) if !next.is_expanded() => Some(expand(&self.shared.context, next, None, self.shared.options.depth_limit)?),
			next => next,
		};
		let (lifecycle, result) = self.shared.patch(parent, live, next);
		lifecycle.run();
		result
	}

	/// Re-renders every dirty root now instead of waiting for the frame.
	///
	/// The frame that was requested still runs, but finds nothing to do.
	pub fn flush(&self) -> FlushReport {
		self.shared.flush()
	}

	#[must_use]
	pub fn last_flush(&self) -> FlushReport {
		self.shared.last_flush.get()
	}

	/// How many times the reconciler was invoked, counting each re-rendered root once.
	#[must_use]
	pub fn patch_count(&self) -> usize {
		self.shared.patches.get()
	}

	/// How many distinct style classes were injected.
	#[must_use]
	pub fn injected_styles(&self) -> usize {
		self.shared.styles.borrow().len()
	}

	/// Whether `id`'s output is part of the rendered tree.
	#[must_use]
	pub fn is_mounted(&self, id: ComponentId) -> bool {
		self.shared.index.borrow().path(id).is_some()
	}

	/// Inspects the retained tree.
	pub fn with_tree<R>(&self, inspect: impl FnOnce(Option<&VNode>) -> R) -> R {
		inspect(self.shared.tree.borrow().as_ref())
	}
}

/// Clears [`Shared::flushing`] when dropped, so that a panicking component doesn't stop all later flushes.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

impl<H: Host> Shared<H> {
	/// The returned hooks match `live` after the patch and are meant to run even if it failed.
	fn patch(&self, parent: NodeKey, live: &mut Option<VNode>, next: Option<VNode>) -> (Lifecycle, Result<()>) {
		let mut styles = self.styles.borrow_mut();
		let mut reconciler = Reconciler::new(&self.host, &mut styles, self.options.depth_limit);
		self.patches.set(self.patches.get() + 1);
		let result = reconciler.patch(parent, live, next);
		(reconciler.finish(), result)
	}

	/// Stores `live` as the retained tree and indexes it.
	fn retain(&self, live: Option<VNode>) {
		let mut index = self.index.borrow_mut();
		match &live {
			Some(root) => index.rebuild(root),
			None => index.clear(),
		}
		*self.tree.borrow_mut() = live;
	}

	fn render(&self, vnode: VNode) -> Result<()> {
		let next = expand(&self.context, vnode, None, self.options.depth_limit)?;
		let mut live = self.tree.borrow_mut().take();

		let (lifecycle, result) = self.patch(self.container, &mut live, Some(next));
		self.retain(live);
		match &result {
			Ok(()) => debug!(components = self.index.borrow().len(), "Rendered."),
			Err(error) => error!("Render failed part of the way: {}", error),
		}
		lifecycle.run();
		result
	}

	fn flush(&self) -> FlushReport {
		if self.flushing.replace(true) {
			warn!("Flush requested while flushing; Ignoring.");
			return FlushReport::default();
		}
		let guard = FlushGuard(&self.flushing);

		let dirty = self.context.take_dirty();
		let purged = self.context.purge();
		let roots = self.context.dirty_roots(&dirty);
		let mut report = FlushReport {
			dirty: dirty.len(),
			roots: roots.len(),
			purged,
			..FlushReport::default()
		};

		let mut lifecycle = Lifecycle::default();
		for id in roots {
			match self.flush_root(id, &mut lifecycle) {
				Ok(true) => report.patched += 1,
				Ok(false) => report.skipped += 1,
				Err(error) => {
					error!(?id, "Failed to re-render component: {}", error);
					report.failed += 1;
				}
			}
		}

		drop(guard);
		self.last_flush.set(report);
		if report.dirty > 0 {
			info!(
				dirty = report.dirty,
				roots = report.roots,
				patched = report.patched,
				skipped = report.skipped,
				failed = report.failed,
				purged = report.purged,
				styles = self.styles.borrow().len(),
				"Flushed."
			);
		}
		lifecycle.run();
		report
	}

	/// Re-renders one dirty root in place. `false` means it isn't mounted and was skipped.
	///
	/// Hooks are collected into `lifecycle` even if the patch fails, since the retained tree keeps what went through.
	#[instrument(skip(self, lifecycle))]
	fn flush_root(&self, id: ComponentId, lifecycle: &mut Lifecycle) -> Result<bool> {
		let component = match self.context.upgrade(id) {
			Some(component) => component,
			None => {
				debug!("Skipping dropped component.");
				return Ok(false);
			}
		};
		let path = match self.index.borrow().path(id) {
			Some(path) => path.to_vec(),
			None => {
				debug!("Skipping component that isn't mounted.");
				return Ok(false);
			}
		};

		let (parent, outer) = {
			let tree = self.tree.borrow();
			let located = tree.as_ref().and_then(|root| {
				let old = node_at(root, &path)?;
				let position = old.components.iter().position(|c| c.id() == id)?;
				if old.dom_handle().is_none() {
					return None;
				}
				let parent = match path.split_last() {
					Some((_, parent_path)) => node_at(root, parent_path)?.dom_handle()?,
					None => self.container,
				};
				Some((parent, old.components[position + 1..].to_vec()))
			});
			match located {
				Some(located) => located,
				None => {
					warn!(?path, "Component index is out of sync with the tree; Skipping.");
					return Ok(false);
				}
			}
		};

		trace!(dirty = component.is_dirty(), "Re-rendering.");
		let mut next = expand(&self.context, VNode::component(ComponentRef(component)), self.context.parent(id), self.options.depth_limit)?;
		next.components.extend(outer);

		let previous = {
			let mut tree = self.tree.borrow_mut();
			match tree.as_mut().and_then(|root| node_at_mut(root, &path)) {
				Some(slot) => mem::replace(slot, VNode::text(String::new())),
				None => {
					warn!(?path, "Tree changed during re-render; Skipping.");
					return Ok(false);
				}
			}
		};

		let mut live = Some(previous);
		let (root_lifecycle, result) = self.patch(parent, &mut live, Some(next));
		lifecycle.extend(root_lifecycle);

		let mut tree = self.tree.borrow_mut();
		match (tree.as_mut().and_then(|root| node_at_mut(root, &path)), live) {
			(Some(slot), Some(live)) => {
				self.index.borrow_mut().reindex(&live, &path);
				*slot = live;
			}
			_ => unreachable!("vortex-dom bug: Lost the re-rendered subtree at {:?}", path),
		}
		result.map(|()| true)
	}
}
