// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! DNS provider abstraction and the change batcher.
//!
//! The record managers talk to DNS exclusively through [`DnsProvider`]:
//! open a [`ChangeRequest`], stage record mutations, submit. The batcher
//! computes the minimal additions and deletions against the live zone so
//! that replayed pod events produce no redundant writes.
//!
//! The [`ZoneApi`] trait is the transport boundary; [`clouddns::CloudDns`]
//! implements it against Google Cloud DNS.

pub mod clouddns;
pub mod error;
pub mod provider;
pub mod request;
pub mod types;

pub use clouddns::{CloudDns, TokenSource};
pub use error::DnsError;
pub use provider::{DnsProvider, ZoneApi};
pub use request::ChangeRequest;
pub use types::{ChangeSet, RecordSet, RecordType};
