#![doc(html_root_url = "https://docs.rs/vortex-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A small component-based virtual DOM.
//!
//! Components render [`VNode`] trees, a [`Renderer`] reconciles them into a [`Host`] (the browser DOM by default),
//! and invalidated components are re-rendered together once per animation frame.
//!
//! The reconciler matches children by position only. Keys are carried on nodes but not used for reordering.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod component;
pub mod diff;
mod error;
pub mod event;
mod expand;
pub mod host;
pub mod renderer;
pub mod scheduler;
pub mod style;
pub mod vnode;

pub use component::{Component, ComponentRef, Handle, Invalidator, State, Stateful, Stateless};
pub use error::{Error, Result};
pub use event::{Event, FocusEvent, InputEvent, KeyboardEvent, MouseEvent, TypedEvent};
pub use host::{Host, NodeKey};
pub use renderer::{FlushReport, Options, Renderer};
pub use scheduler::{ComponentId, Context};
pub use style::{Pseudo, Style, StyleInjector, Stylesheet};
pub use vnode::{AttrName, AttrValue, EventKind, NodeKind, VNode};
