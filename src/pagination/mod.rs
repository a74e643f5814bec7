//! Pagination module
//!
//! Supports: Link Header, Next URL (in the body), single page
//!
//! # Overview
//!
//! A [`Paginator`] looks at one response and decides where the next page
//! lives. [`PageRequest`] carries the URL and query parameters of one step
//! of a sequence, and [`LimitPages`] bounds how many pages of a sequence get
//! consumed.

mod limit;
mod strategies;
mod types;

pub use limit::{limit_pages, LimitPages};
pub use strategies::{LinkHeaderPaginator, NextUrlPaginator, SinglePagePaginator};
pub use types::{NextPage, PageRequest, PageResponse, Paginator};
