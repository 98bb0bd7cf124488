//! Component expansion and the component→VNode index.
//!
//! The differ only understands elements and text, so component references are replaced by their
//! render output before any tree is patched. The root of each component's output remembers the component,
//! which is what [`ComponentIndex`] is rebuilt from after every patch.

use crate::{
	error::{Error, Result},
	scheduler::{ComponentId, Context},
	vnode::{Content, VNode},
};
use hashbrown::HashMap;
use tracing::{error, trace};

/// Replaces every component reference in `node` by its (possibly cached) render output, recursively.
///
/// `parent` is the component whose output `node` is, if any. It is recorded as the parent link of every component found.
///
/// # Errors
///
/// Iff components nest deeper than `depth_limit`, which usually means a component renders a reference to itself.
pub(crate) fn expand(context: &Context, mut node: VNode, parent: Option<ComponentId>, depth_limit: usize) -> Result<VNode> {
	if depth_limit == 0 {
		error!("Depth limit reached while expanding components");
		return Err(Error::DepthLimit);
	}

	let component = match &node.content {
		Content::Component(component) => Some(component.clone()),
		Content::Element(_) | Content::Text(_) => None,
	};
	let component = match component {
		Some(component) => component,
		None => {
			let children = core::mem::take(&mut node.children);
			node.children = children
				.into_iter()
				.map(|child| expand(context, child, parent, depth_limit - 1))
				.collect::<Result<_>>()?;
			return Ok(node);
		}
	};

	let id = component.id();
	context.set_parent(id, parent);
	let rendered = component.0.render_cached();
	trace!(?id, ?parent, "Expanding component.");

	let mut expanded = expand(context, rendered, Some(id), depth_limit - 1)?;
	expanded.components.push(component);
	Ok(expanded)
}

/// Where each mounted component's output currently sits in the retained tree, as child-index paths from the root.
#[derive(Debug, Default)]
pub(crate) struct ComponentIndex {
	paths: HashMap<ComponentId, Vec<usize>>,
}

impl ComponentIndex {
	pub(crate) fn rebuild(&mut self, root: &VNode) {
		self.paths.clear();
		self.walk(root, &mut Vec::new());
	}

	/// Refreshes the entries at or below `prefix` after the subtree there was replaced by `subtree`.
	pub(crate) fn reindex(&mut self, subtree: &VNode, prefix: &[usize]) {
		self.paths.retain(|_, path| !path.starts_with(prefix));
		self.walk(subtree, &mut prefix.to_vec());
	}

	fn walk(&mut self, node: &VNode, path: &mut Vec<usize>) {
		for component in &node.components {
			self.paths.insert(component.id(), path.clone());
		}
		for (i, child) in node.children.iter().enumerate() {
			path.push(i);
			self.walk(child, path);
			path.pop();
		}
	}

	pub(crate) fn path(&self, id: ComponentId) -> Option<&[usize]> {
		self.paths.get(&id).map(Vec::as_slice)
	}

	pub(crate) fn len(&self) -> usize {
		self.paths.len()
	}

	pub(crate) fn clear(&mut self) {
		self.paths.clear();
	}
}

pub(crate) fn node_at<'a>(root: &'a VNode, path: &[usize]) -> Option<&'a VNode> {
	path.iter().try_fold(root, |node, &i| node.children.get(i))
}

pub(crate) fn node_at_mut<'a>(root: &'a mut VNode, path: &[usize]) -> Option<&'a mut VNode> {
	path.iter().try_fold(root, |node, &i| node.children.get_mut(i))
}
