use pretty_assertions::assert_eq;
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};
use vortex_dom::{host::memory::MemoryHost, Component, FlushReport, NodeKey, Options, Renderer, VNode};

fn renderer() -> (Renderer<MemoryHost>, NodeKey) {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let host = MemoryHost::new();
	let container = host.create_root("main");
	(Renderer::with_host(host, container, Options::default()), container)
}

#[test]
fn writes_are_batched_into_one_frame() {
	let (renderer, container) = renderer();
	let renders = Rc::new(Cell::new(0));
	let counter = {
		let renders = Rc::clone(&renders);
		renderer.context().stateful(0, move |count| {
			renders.set(renders.get() + 1);
			VNode::element("span").child(VNode::text(count.get().to_string()))
		})
	};

	renderer.render(counter.vnode()).unwrap();
	assert_eq!(renders.get(), 1);
	let patches = renderer.patch_count();

	counter.state().set(1);
	counter.state().set(2);
	counter.state().set(3);
	assert_eq!(renders.get(), 1);
	assert!(renderer.context().frame_pending());
	assert_eq!(renderer.host().pending_frames(), 1);

	assert_eq!(renderer.host().run_frames(), 1);
	assert_eq!(renders.get(), 2);
	assert_eq!(renderer.patch_count(), patches + 1);
	assert_eq!(renderer.host().inner_html(container), "<span>3</span>");
	assert_eq!(
		renderer.last_flush(),
		FlushReport {
			dirty: 1,
			roots: 1,
			patched: 1,
			..FlushReport::default()
		}
	);
	assert!(!renderer.context().frame_pending());
	assert_eq!(renderer.host().pending_frames(), 0);
}

#[test]
fn dirty_descendants_are_covered_by_their_ancestor() {
	let (renderer, container) = renderer();
	let context = renderer.context();
	let outer_renders = Rc::new(Cell::new(0));

	let inner = context.stateful("a".to_owned(), |label| VNode::element("b").child(VNode::text(label.get())));
	let outer = {
		let inner = inner.clone();
		let outer_renders = Rc::clone(&outer_renders);
		context.stateful(0, move |n| {
			outer_renders.set(outer_renders.get() + 1);
			VNode::element("div").child(VNode::text(n.get().to_string())).child(inner.vnode())
		})
	};

	renderer.render(outer.vnode()).unwrap();
	assert_eq!(context.parent(inner.id()), Some(outer.id()));
	assert_eq!(renderer.host().inner_html(container), "<div>0<b>a</b></div>");

	inner.state().set("z".to_owned());
	outer.state().set(5);
	assert_eq!(renderer.host().pending_frames(), 1);
	renderer.host().run_frames();

	let report = renderer.last_flush();
	assert_eq!((report.dirty, report.roots, report.patched), (2, 1, 1));
	assert_eq!(renderer.host().inner_html(container), "<div>5<b>z</b></div>");
	assert_eq!(outer_renders.get(), 2);

	// Only the inner component re-renders now.
	inner.state().set("y".to_owned());
	renderer.host().run_frames();
	assert_eq!(renderer.host().inner_html(container), "<div>5<b>y</b></div>");
	assert_eq!(outer_renders.get(), 2);
	assert!(renderer.is_mounted(inner.id()));
}

#[test]
fn nested_roots_rerender_in_place() {
	let (renderer, container) = renderer();
	let context = renderer.context();
	let inner = context.stateful(1, |n| VNode::element("em").child(VNode::text(n.get().to_string())));
	let wrapper = {
		let inner = inner.clone();
		context.stateless(move || inner.vnode())
	};

	renderer.render(VNode::element("p").child(wrapper.vnode())).unwrap();
	let em = renderer.host().children(renderer.host().children(container)[0])[0];
	renderer.host().clear_mutations();

	inner.state().set(2);
	renderer.host().run_frames();
	assert_eq!(renderer.host().inner_html(container), "<p><em>2</em></p>");
	assert_eq!(renderer.host().children(renderer.host().children(container)[0]), vec![em]);
	assert_eq!(renderer.host().mutations().len(), 1);

	// Both components still own the `<em>`.
	assert!(renderer.is_mounted(inner.id()));
	assert!(renderer.is_mounted(wrapper.id()));
	wrapper.invalidate();
	inner.state().set(3);
	renderer.host().run_frames();
	assert_eq!(renderer.last_flush().roots, 1);
	assert_eq!(renderer.host().inner_html(container), "<p><em>3</em></p>");
}

#[test]
fn unmounted_components_are_skipped() {
	let (renderer, container) = renderer();
	let context = renderer.context();
	let shown = context.stateful(true, |flag| VNode::text(flag.get().to_string()));
	let never_rendered = context.stateless(|| VNode::text("never"));

	renderer.render(VNode::element("div").child(shown.vnode())).unwrap();
	renderer.render(VNode::element("div")).unwrap();
	assert!(!renderer.is_mounted(shown.id()));

	shown.state().set(false);
	never_rendered.invalidate();
	renderer.host().run_frames();

	let report = renderer.last_flush();
	assert_eq!((report.roots, report.patched, report.skipped), (2, 0, 2));
	assert_eq!(renderer.host().inner_html(container), "<div></div>");
}

#[test]
fn dropped_components_are_purged_on_flush() {
	let (renderer, _) = renderer();
	let context = renderer.context();
	let kept = context.stateful(0, |n| VNode::text(n.get().to_string()));
	let dropped = context.stateless(|| VNode::text("gone"));

	renderer.render(VNode::element("div").child(kept.vnode()).child(dropped.vnode())).unwrap();
	renderer.render(VNode::element("div").child(kept.vnode())).unwrap();
	drop(dropped);
	assert_eq!(context.component_count(), 2);

	kept.state().set(1);
	renderer.host().run_frames();
	assert_eq!(renderer.last_flush().purged, 1);
	assert_eq!(context.component_count(), 1);
}

#[test]
fn explicit_flush_leaves_the_frame_empty() {
	let (renderer, container) = renderer();
	let counter = renderer.context().stateful(0, |n| VNode::text(n.get().to_string()));
	renderer.render(VNode::element("div").child(counter.vnode())).unwrap();

	counter.state().update(|n| n + 1);
	assert_eq!(renderer.flush().patched, 1);
	assert_eq!(renderer.host().inner_html(container), "<div>1</div>");

	renderer.host().run_frames();
	assert_eq!(renderer.last_flush(), FlushReport::default());
}

#[derive(Clone, Default)]
struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
	fn write(&self, entry: String) {
		self.0.borrow_mut().push(entry);
	}

	fn take(&self) -> Vec<String> {
		std::mem::take(&mut *self.0.borrow_mut())
	}
}

struct Probe {
	name: &'static str,
	journal: Journal,
}

impl Component for Probe {
	fn render(&self) -> VNode {
		VNode::element("p").child(VNode::text(self.name))
	}

	fn mounted(&self) {
		self.journal.write(format!("mounted {}", self.name));
	}

	fn unmounted(&self) {
		self.journal.write(format!("unmounted {}", self.name));
	}
}

#[test]
fn lifecycle_hooks() {
	let (renderer, _) = renderer();
	let journal = Journal::default();
	let a = renderer.context().component(Probe {
		name: "a",
		journal: journal.clone(),
	});
	let b = renderer.context().component(Probe {
		name: "b",
		journal: journal.clone(),
	});

	renderer.render(VNode::element("div").child(a.vnode())).unwrap();
	assert_eq!(journal.take(), vec!["mounted a"]);

	renderer.render(VNode::element("div").child(a.vnode())).unwrap();
	assert_eq!(journal.take(), Vec::<String>::new());

	// Same element, different owner.
	renderer.render(VNode::element("div").child(b.vnode())).unwrap();
	assert_eq!(journal.take(), vec!["unmounted a", "mounted b"]);

	renderer.unmount().unwrap();
	assert_eq!(journal.take(), vec!["unmounted b"]);
}

struct Toggle {
	open: vortex_dom::State<bool>,
	child: vortex_dom::Handle<Probe>,
}

impl Component for Toggle {
	fn render(&self) -> VNode {
		let open = self.open.clone();
		VNode::element("details")
			.on_click(move |_| open.update(|open| !open))
			.child_if(if self.open.get() { Some(self.child.vnode()) } else { None })
	}
}

#[test]
fn composite_with_state() {
	let (renderer, container) = renderer();
	let journal = Journal::default();
	let toggle = renderer.context().mount(|invalidator| Toggle {
		open: vortex_dom::State::new(false, invalidator.clone()),
		child: invalidator.context().component(Probe {
			name: "body",
			journal: journal.clone(),
		}),
	});

	renderer.render(toggle.vnode()).unwrap();
	assert_eq!(renderer.host().inner_html(container), "<details></details>");

	let details = renderer.host().children(container)[0];
	renderer.host().dispatch(details, Rc::new(vortex_dom::host::memory::SyntheticEvent::new("click")));
	renderer.host().run_frames();
	assert_eq!(renderer.host().inner_html(container), "<details><p>body</p></details>");
	assert_eq!(journal.take(), vec!["mounted body"]);
	assert_eq!(renderer.host().children(container), vec![details]);

	renderer.host().dispatch(details, Rc::new(vortex_dom::host::memory::SyntheticEvent::new("click")));
	renderer.host().run_frames();
	assert_eq!(renderer.host().inner_html(container), "<details></details>");
	assert_eq!(journal.take(), vec!["unmounted body"]);
}

#[test]
fn a_failed_root_leaves_its_siblings_alone() {
	let (renderer, container) = renderer();
	let context = renderer.context();
	let items = context.stateful(1_usize, |count| {
		VNode::element("ul").children((0..count.get()).map(|i| VNode::element("li").child(VNode::text(i.to_string()))))
	});
	let label = context.stateful("a".to_owned(), |label| VNode::element("b").child(VNode::text(label.get())));
	let page = {
		let (items, label) = (items.clone(), label.clone());
		context.stateful(0_u32, move |version| VNode::element("div").attr("data-version", version.get()).child(items.vnode()).child(label.vnode()))
	};

	renderer.render(page.vnode()).unwrap();
	let div = renderer.host().children(container)[0];
	let ul = renderer.host().children(div)[0];
	let nodes = renderer.host().node_count();

	// The second `<li>` gets created, but its text doesn't.
	renderer.host().fail_next("createTextNode");
	items.state().set(3);
	label.state().set("b".to_owned());
	renderer.host().run_frames();
	assert_eq!(
		renderer.last_flush(),
		FlushReport {
			dirty: 2,
			roots: 2,
			patched: 1,
			failed: 1,
			..FlushReport::default()
		}
	);
	assert_eq!(renderer.host().inner_html(container), "<div data-version=\"0\"><ul><li>0</li></ul><b>b</b></div>");
	assert_eq!(renderer.host().node_count(), nodes);
	assert!(renderer.is_mounted(items.id()));

	// The ancestor patches over what actually went through.
	page.state().set(1);
	renderer.host().run_frames();
	assert_eq!(renderer.last_flush().patched, 1);
	assert_eq!(
		renderer.host().inner_html(container),
		"<div data-version=\"1\"><ul><li>0</li><li>1</li><li>2</li></ul><b>b</b></div>"
	);

	items.state().set(2);
	renderer.host().run_frames();
	assert_eq!(
		renderer.last_flush(),
		FlushReport {
			dirty: 1,
			roots: 1,
			patched: 1,
			..FlushReport::default()
		}
	);
	assert_eq!(renderer.host().inner_html(container), "<div data-version=\"1\"><ul><li>0</li><li>1</li></ul><b>b</b></div>");
	assert_eq!(renderer.host().children(div)[0], ul);
}

#[test]
fn a_failed_root_updates_again_on_its_next_invalidation() {
	let (renderer, container) = renderer();
	let counter = renderer.context().stateful(0, |n| VNode::element("span").child(VNode::text(n.get().to_string())));
	renderer.render(VNode::element("div").child(counter.vnode())).unwrap();

	renderer.host().fail_next("setText");
	counter.state().set(1);
	renderer.host().run_frames();
	assert_eq!(renderer.last_flush().failed, 1);
	assert_eq!(renderer.host().inner_html(container), "<div><span>0</span></div>");

	// The retained text is still the old one, so the same value is written again.
	counter.state().set(1);
	renderer.host().run_frames();
	assert_eq!(renderer.last_flush().patched, 1);
	assert_eq!(renderer.host().inner_html(container), "<div><span>1</span></div>");
}

#[test]
fn a_panicking_render_does_not_stop_later_flushes() {
	let (renderer, container) = renderer();
	let fragile = renderer.context().stateful(0, |n| {
		assert_ne!(n.get(), 1, "one is unlucky");
		VNode::text(n.get().to_string())
	});
	renderer.render(VNode::element("p").child(fragile.vnode())).unwrap();

	fragile.state().set(1);
	let host = renderer.host();
	assert!(std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| host.run_frames())).is_err());

	fragile.state().set(2);
	assert_eq!(renderer.host().run_frames(), 1);
	assert_eq!(renderer.last_flush().patched, 1);
	assert_eq!(renderer.host().inner_html(container), "<p>2</p>");
}
