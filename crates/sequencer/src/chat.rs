use std::time::Duration;

use serde::Serialize;
use shared::domain::{AgentName, ChatMessage, ChatRole, IncidentStatus};
use tokio::{sync::broadcast, time::Instant};
use tracing::{debug, info};

use crate::{scheduler::Scheduler, script};

pub const FIRST_REPLY_DELAY: Duration = Duration::from_millis(600);
pub const AFTER_TOOL_DELAY: Duration = Duration::from_millis(400);
pub const AFTER_MESSAGE_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatConfig {
    pub first_reply: Duration,
    pub after_tool: Duration,
    pub after_message: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            first_reply: FIRST_REPLY_DELAY,
            after_tool: AFTER_TOOL_DELAY,
            after_message: AFTER_MESSAGE_DELAY,
        }
    }
}

impl ChatConfig {
    /// Offsets from the user's message at which each reply appears. Tool
    /// output is quick to follow; prose takes longer to "type".
    pub fn reply_offsets(&self, replies: &[ChatMessage]) -> Vec<Duration> {
        let mut at = self.first_reply;
        replies
            .iter()
            .map(|reply| {
                let offset = at;
                at += if reply.role == ChatRole::Tool {
                    self.after_tool
                } else {
                    self.after_message
                };
                offset
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChatEvent {
    Message { message: ChatMessage },
    AgentActive { agent: Option<AgentName> },
    StatusChanged { status: IncidentStatus },
    Idle,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    is_loading: bool,
    active_agent: Option<AgentName>,
    incident_status: IncidentStatus,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![script::welcome()],
            is_loading: false,
            active_agent: None,
            incident_status: IncidentStatus::Monitoring,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn active_agent(&self) -> Option<AgentName> {
        self.active_agent
    }

    pub fn incident_status(&self) -> IncidentStatus {
        self.incident_status
    }

    /// Accepts an operator message unless it is blank or a reply is still
    /// being typed.
    pub fn begin(&mut self, text: &str) -> Option<Vec<ChatEvent>> {
        if text.trim().is_empty() || self.is_loading {
            return None;
        }
        let message = ChatMessage::user(text);
        self.messages.push(message.clone());
        self.is_loading = true;
        self.incident_status = IncidentStatus::Investigating;
        Some(vec![
            ChatEvent::Message { message },
            ChatEvent::StatusChanged {
                status: IncidentStatus::Investigating,
            },
        ])
    }

    /// Appends one scripted reply. The last one of a conversation ends the
    /// loading state and may escalate the incident.
    pub fn deliver(&mut self, reply: ChatMessage, last: bool, escalate: bool) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        if let Some(agent) = reply.agent {
            if self.active_agent != Some(agent) {
                self.active_agent = Some(agent);
                events.push(ChatEvent::AgentActive { agent: Some(agent) });
            }
        }
        self.messages.push(reply.clone());
        events.push(ChatEvent::Message { message: reply });

        if last {
            self.is_loading = false;
            self.active_agent = None;
            events.push(ChatEvent::AgentActive { agent: None });
            if escalate {
                self.incident_status = IncidentStatus::Critical;
                events.push(ChatEvent::StatusChanged {
                    status: IncidentStatus::Critical,
                });
            }
            events.push(ChatEvent::Idle);
        }
        events
    }
}

/// Plays scripted agent replies into a [`ChatSession`] with typing delays.
pub struct ChatDriver {
    scheduler: Scheduler<ChatSession>,
    config: ChatConfig,
    events: broadcast::Sender<ChatEvent>,
}

impl ChatDriver {
    pub fn new(config: ChatConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            scheduler: Scheduler::new(ChatSession::new()),
            config,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> ChatSession {
        self.scheduler.with(|session| session.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.scheduler.with(|session| session.is_loading())
    }

    /// Returns `false` when the message was ignored.
    pub fn send(&self, text: &str) -> bool {
        let started = Instant::now();
        let Some(accepted) = self.scheduler.with(|session| session.begin(text)) else {
            debug!("chat message ignored");
            return false;
        };
        for event in accepted {
            let _ = self.events.send(event);
        }

        let replies = script::replies_for(text);
        let escalate = script::escalates(text);
        let offsets = self.config.reply_offsets(&replies);
        let count = replies.len();
        info!(replies = count, escalate, "scripted replies scheduled");

        for (index, (reply, offset)) in replies.into_iter().zip(offsets).enumerate() {
            let events = self.events.clone();
            let last = index + 1 == count;
            self.scheduler.schedule_at(started + offset, move |session| {
                for event in session.deliver(reply, last, escalate) {
                    let _ = events.send(event);
                }
            });
        }
        true
    }

    /// Drops every reply still being typed.
    pub fn teardown(&self) {
        self.scheduler.invalidate();
    }
}

impl Default for ChatDriver {
    fn default() -> Self {
        Self::new(ChatConfig::default())
    }
}
