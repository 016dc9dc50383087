//! The four fixed output channels and their generation limits.

use std::fmt;

use crate::communications::prompts::{email_task, gate_task, sms_task, social_task};
use crate::models::disruption::DisruptionRecord;

/// Output channel. Declaration order is generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Email,
    Sms,
    GateTalkingPoints,
    SocialMedia,
}

impl Channel {
    /// Response field name for this channel.
    pub fn key(&self) -> &'static str {
        match self {
            Channel::Email => "passenger_email",
            Channel::Sms => "sms_notification",
            Channel::GateTalkingPoints => "gate_agent_talking_points",
            Channel::SocialMedia => "social_media_response",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Static generation settings for one channel.
#[derive(Clone, Copy)]
pub struct ChannelSpec {
    pub channel: Channel,
    /// Token budget passed to the model.
    pub max_tokens: u32,
    /// Hard platform limit in characters, enforced after generation.
    pub char_ceiling: Option<usize>,
    build_task: fn(&DisruptionRecord) -> String,
}

impl ChannelSpec {
    pub fn task_instructions(&self, record: &DisruptionRecord) -> String {
        (self.build_task)(record)
    }
}

pub const SMS_CHAR_LIMIT: usize = 160;
pub const SOCIAL_CHAR_LIMIT: usize = 280;

/// Every channel, in generation order.
pub const CHANNEL_SPECS: [ChannelSpec; 4] = [
    ChannelSpec {
        channel: Channel::Email,
        max_tokens: 400,
        char_ceiling: None,
        build_task: email_task,
    },
    ChannelSpec {
        channel: Channel::Sms,
        max_tokens: 100,
        char_ceiling: Some(SMS_CHAR_LIMIT),
        build_task: sms_task,
    },
    ChannelSpec {
        channel: Channel::GateTalkingPoints,
        max_tokens: 450,
        char_ceiling: None,
        build_task: gate_task,
    },
    ChannelSpec {
        channel: Channel::SocialMedia,
        max_tokens: 150,
        char_ceiling: Some(SOCIAL_CHAR_LIMIT),
        build_task: social_task,
    },
];
