// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipegraph contributors

//! Recursive channel extraction from nested values

use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::placeholder::decode_into;
use super::Channel;
use crate::errors::GraphResult;

/// Insertion-ordered set of distinct channels
#[derive(Debug, Default)]
pub struct ChannelSet {
    seen: HashSet<Channel>,
    channels: Vec<Channel>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel; returns false if it was already present
    pub fn insert(&mut self, channel: Channel) -> bool {
        if self.seen.contains(&channel) {
            return false;
        }
        self.seen.insert(channel.clone());
        self.channels.push(channel);
        true
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn into_vec(self) -> Vec<Channel> {
        self.channels
    }
}

/// Values that may contain channels, directly or as embedded placeholders
pub trait ExtractChannels {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()>;
}

/// Collect every distinct channel reachable from `value`
pub fn extract_recursive<T: ExtractChannels + ?Sized>(value: &T) -> GraphResult<Vec<Channel>> {
    let mut set = ChannelSet::new();
    value.collect_channels(&mut set)?;
    Ok(set.into_vec())
}

impl ExtractChannels for Channel {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        set.insert(self.clone());
        Ok(())
    }
}

impl<T: ExtractChannels + ?Sized> ExtractChannels for &T {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        (**self).collect_channels(set)
    }
}

impl ExtractChannels for str {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        decode_into(self, set)
    }
}

impl ExtractChannels for String {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        decode_into(self, set)
    }
}

impl ExtractChannels for Value {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        match self {
            Value::String(s) => decode_into(s, set),
            Value::Array(items) => items.collect_channels(set),
            Value::Object(map) => {
                for (key, value) in map {
                    decode_into(key, set)?;
                    value.collect_channels(set)?;
                }
                Ok(())
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => Ok(()),
        }
    }
}

impl<T: ExtractChannels> ExtractChannels for Option<T> {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        match self {
            Some(inner) => inner.collect_channels(set),
            None => Ok(()),
        }
    }
}

impl<T: ExtractChannels> ExtractChannels for [T] {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        for item in self {
            item.collect_channels(set)?;
        }
        Ok(())
    }
}

impl<T: ExtractChannels> ExtractChannels for Vec<T> {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        self.as_slice().collect_channels(set)
    }
}

impl<K: ExtractChannels, V: ExtractChannels> ExtractChannels for BTreeMap<K, V> {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        for (key, value) in self {
            key.collect_channels(set)?;
            value.collect_channels(set)?;
        }
        Ok(())
    }
}

impl<K: ExtractChannels, V: ExtractChannels, S> ExtractChannels for HashMap<K, V, S> {
    fn collect_channels(&self, set: &mut ChannelSet) -> GraphResult<()> {
        for (key, value) in self {
            key.collect_channels(set)?;
            value.collect_channels(set)?;
        }
        Ok(())
    }
}
