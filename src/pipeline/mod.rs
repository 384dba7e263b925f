//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements one transformation step and is testable on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//!                       ┌──▶ html ──▶ browser                (Backend::Browser)
//! input ──▶ diagrams ──┤
//!  (path)    (mmdc)     └──▶ parse ──▶ mapper ──▶ paginate ──▶ pdf   (Backend::Layout)
//!                          (events)   (walker)   (pages)     (lopdf)
//! ```
//!
//! 1. [`input`]    — read and validate the Markdown file, derive output paths
//! 2. [`diagrams`] — rasterise fenced `mermaid` blocks into the run's temp
//!    directory and substitute image references
//! 3. [`parse`]    — fold `pulldown-cmark` events into a `ContentNode` tree
//! 4. [`mapper`]   — walk the tree into `LayoutElement`s; images are sized by
//!    [`image`]
//! 5. [`paginate`] — measure with [`metrics`] and place elements on pages;
//!    runs in `spawn_blocking`
//! 6. [`pdf`]      — serialise the pages with `lopdf`
//!
//! The browser backend instead renders [`html`] (images inlined by
//! [`encode`]) and hands it to [`browser`]. Per-run state lives in
//! [`context`].

pub mod browser;
pub mod context;
pub mod diagrams;
pub mod encode;
pub mod html;
pub mod image;
pub mod input;
pub mod mapper;
pub mod metrics;
pub mod paginate;
pub mod parse;
pub mod pdf;
