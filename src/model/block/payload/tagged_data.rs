// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Module containing the [`TaggedDataPayload`] type.

use serde::{Deserialize, Serialize};

use crate::model::{util::bytify, ValidationError};

/// Represents the tagged data payload for data blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedDataPayload {
    #[serde(with = "bytify")]
    tag: Box<[u8]>,
    #[serde(with = "bytify")]
    data: Box<[u8]>,
}

impl TaggedDataPayload {
    /// A `&str` representation of the type.
    pub const KIND: &'static str = "tagged_data";
    /// The maximum length of the tag.
    pub const MAX_TAG_LENGTH: usize = 64;
    /// The maximum length of tag and data together.
    pub const MAX_LENGTH: usize = 32_768;

    /// Creates a new tagged data payload.
    pub fn new(tag: impl Into<Box<[u8]>>, data: impl Into<Box<[u8]>>) -> Result<Self, ValidationError> {
        let payload = Self {
            tag: tag.into(),
            data: data.into(),
        };
        payload.verify()?;
        Ok(payload)
    }

    /// The tag.
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// The data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn verify(&self) -> Result<(), ValidationError> {
        let len = self.tag.len() + self.data.len();
        if self.tag.len() > Self::MAX_TAG_LENGTH || len > Self::MAX_LENGTH {
            return Err(ValidationError::TaggedDataTooLarge(len));
        }
        Ok(())
    }
}
