use pretty_assertions::assert_eq;
use std::rc::Rc;
use vortex_dom::{
	host::memory::{MemoryHost, Mutation},
	Options, Pseudo, Renderer, Style, Stylesheet, VNode,
};

fn card() -> Style {
	Style::new()
		.declare("padding", "1rem")
		.declare("border-color", "#ccc")
		.on(Pseudo::Hover, |hover| hover.declare("border-color", "navy"))
		.media("@media (max-width: 600px)", |narrow| narrow.declare("padding", "0"))
}

#[test]
fn equal_styles_are_injected_once() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let host = MemoryHost::new();
	let container = host.create_root("main");
	let renderer = Renderer::with_host(host, container, Options::default());
	let context = renderer.context();

	let first = {
		let style = Rc::new(card());
		context.stateless(move || VNode::element("article").style(Rc::clone(&style)).child(VNode::text("one")))
	};
	let second = {
		let style = Rc::new(card());
		context.stateless(move || VNode::element("article").class("wide").style(Rc::clone(&style)).child(VNode::text("two")))
	};

	renderer.render(VNode::element("div").child(first.vnode()).child(second.vnode())).unwrap();

	let css: Vec<String> = renderer
		.host()
		.mutations()
		.into_iter()
		.filter_map(|m| match m {
			Mutation::AppendCss { css } => Some(css),
			_ => None,
		})
		.collect();
	assert_eq!(css.len(), 1);
	assert_eq!(renderer.injected_styles(), 1);

	let class_name = card().class_name().into_owned();
	assert!(class_name.starts_with("vtx-"));
	assert_eq!(
		renderer.host().stylesheet(),
		format!(
			".{0} {{border-color: #ccc; padding: 1rem;}}\n.{0}:hover {{border-color: navy;}}\n@media (max-width: 600px) {{ .{0} {{padding: 0;}} }}\n",
			class_name
		)
	);

	let div = renderer.host().children(container)[0];
	let articles = renderer.host().children(div);
	assert_eq!(renderer.host().get_attribute(articles[0], "class"), Some(class_name.clone()));
	assert_eq!(renderer.host().get_attribute(articles[1], "class"), Some(format!("wide {}", class_name)));
}

#[test]
fn switching_styles_swaps_only_the_style_token() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let host = MemoryHost::new();
	let container = host.create_root("main");
	let renderer = Renderer::with_host(host, container, Options::default());

	let plain = Rc::new(Style::new().declare("color", "black"));
	let loud = Rc::new(plain.extend(|style| style.declare("font-weight", "bold")));
	assert_ne!(plain.class_name(), loud.class_name());

	renderer.render(VNode::element("p").class("note").style(Rc::clone(&plain))).unwrap();
	let p = renderer.host().children(container)[0];
	renderer.render(VNode::element("p").class("note").style(Rc::clone(&loud))).unwrap();
	assert_eq!(renderer.host().get_attribute(p, "class"), Some(format!("note {}", loud.class_name())));
	assert_eq!(renderer.injected_styles(), 2);

	// Going back doesn't inject again.
	renderer.host().clear_mutations();
	renderer.render(VNode::element("p").class("note").style(Rc::clone(&plain))).unwrap();
	assert!(!renderer.host().mutations().iter().any(|m| matches!(m, Mutation::AppendCss { .. })));
	assert_eq!(renderer.host().get_attribute(p, "class"), Some(format!("note {}", plain.class_name())));
}

#[test]
fn invalid_values_fall_back() {
	let style = Style::new().declare("color", "not-a-colour").declare("width", "wide").declare("font-weight", "heavy");
	assert_eq!(style.declaration("color"), Some("black"));
	assert_eq!(style.declaration("width"), Some("0"));
	assert_eq!(style.declaration("font-weight"), Some("normal"));
}
