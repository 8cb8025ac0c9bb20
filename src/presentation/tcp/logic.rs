//! Chat Logic
//!
//! Handles decoded frames for a session: login through the directory,
//! heartbeats, and relaying text messages between sessions on this server.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::frame::{message_id, Frame};
use super::load::LoadReporter;
use super::registry::SessionRegistry;
use super::session::Session;
use crate::application::dto::{
    ChatLoginRequest, ChatLoginResponse, HeartbeatResponse, NotifyOffline, TextChatMsgRequest,
    TextChatMsgResponse,
};
use crate::application::services::DirectoryApi;
use crate::shared::error::ErrorCode;

pub struct ChatLogic {
    registry: Arc<SessionRegistry>,
    directory: Arc<dyn DirectoryApi>,
    reporter: Arc<LoadReporter>,
}

impl ChatLogic {
    pub fn new(
        registry: Arc<SessionRegistry>,
        directory: Arc<dyn DirectoryApi>,
        reporter: Arc<LoadReporter>,
    ) -> Self {
        Self {
            registry,
            directory,
            reporter,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn reporter(&self) -> &Arc<LoadReporter> {
        &self.reporter
    }

    /// Handle one inbound frame.
    pub async fn dispatch(&self, session: &Arc<Session>, frame: Frame) {
        match frame.id {
            message_id::CHAT_LOGIN => self.handle_login(session, &frame).await,
            message_id::HEARTBEAT_REQ => self.handle_heartbeat(session),
            message_id::TEXT_CHAT_MSG_REQ => self.handle_text(session, &frame),
            other => {
                debug!(session_id = %session.id(), msg_id = other, "Ignoring unknown message id");
            }
        }
    }

    /// Tidy up after a connection ends.
    pub async fn on_session_closed(&self, session: &Arc<Session>) {
        if self.registry.unregister(session.id()) && session.user_id().is_some() {
            self.reporter.report().await;
        }
    }

    #[instrument(skip_all, fields(session_id = %session.id()))]
    async fn handle_login(&self, session: &Arc<Session>, frame: &Frame) {
        let request: ChatLoginRequest = match frame.parse() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed login body");
                session.send_json(
                    message_id::CHAT_LOGIN_RSP,
                    &ChatLoginResponse {
                        error: ErrorCode::ErrorJson,
                        uid: 0,
                    },
                );
                return;
            }
        };

        let uid = request.uid;
        if session.user_id().is_some_and(|bound| bound != uid) {
            warn!(uid, bound = ?session.user_id(), "Login for a different user on a bound session");
            session.send_json(
                message_id::CHAT_LOGIN_RSP,
                &ChatLoginResponse {
                    error: ErrorCode::UidInvalid,
                    uid,
                },
            );
            return;
        }

        let reply = self.directory.login(uid, &request.token).await;
        if !reply.error.is_success() {
            info!(uid, code = ?reply.error, "Chat login rejected");
            session.send_json(
                message_id::CHAT_LOGIN_RSP,
                &ChatLoginResponse {
                    error: reply.error,
                    uid,
                },
            );
            return;
        }

        session.bind_user(uid);
        let notice = Frame::json(
            message_id::NOTIFY_OFFLINE,
            &NotifyOffline {
                error: ErrorCode::Success,
                uid,
            },
        )
        .ok();
        if let Err(e) = self.registry.register(session, notice) {
            warn!(error = %e, "Failed to register session");
            return;
        }

        session.send_json(
            message_id::CHAT_LOGIN_RSP,
            &ChatLoginResponse {
                error: ErrorCode::Success,
                uid,
            },
        );
        info!(uid, "User logged in");
        self.reporter.report().await;
    }

    fn handle_heartbeat(&self, session: &Arc<Session>) {
        session.send_json(
            message_id::HEARTBEAT_RSP,
            &HeartbeatResponse {
                error: ErrorCode::Success,
            },
        );
    }

    fn handle_text(&self, session: &Arc<Session>, frame: &Frame) {
        let Some(uid) = session.user_id() else {
            debug!(session_id = %session.id(), "Ignoring text message before login");
            return;
        };

        let request: TextChatMsgRequest = match frame.parse() {
            Ok(request) => request,
            Err(e) => {
                warn!(session_id = %session.id(), error = %e, "Malformed text message body");
                session.send_json(
                    message_id::TEXT_CHAT_MSG_RSP,
                    &TextChatMsgResponse {
                        error: ErrorCode::ErrorJson,
                        touid: 0,
                        delivered: false,
                    },
                );
                return;
            }
        };

        if request.fromuid != uid {
            warn!(uid, fromuid = request.fromuid, "Text message sender does not match session");
            session.send_json(
                message_id::TEXT_CHAT_MSG_RSP,
                &TextChatMsgResponse {
                    error: ErrorCode::UidInvalid,
                    touid: request.touid,
                    delivered: false,
                },
            );
            return;
        }

        let delivered = match self.registry.lookup(request.touid) {
            Some(peer) => peer.send_json(message_id::NOTIFY_TEXT_CHAT_MSG, &request),
            None => {
                debug!(touid = request.touid, "Recipient not online on this server");
                false
            }
        };

        session.send_json(
            message_id::TEXT_CHAT_MSG_RSP,
            &TextChatMsgResponse {
                error: ErrorCode::Success,
                touid: request.touid,
                delivered,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::{LoginResponse, TextMessage};
    use crate::application::services::MockDirectoryApi;
    use crate::domain::LoadStore;
    use crate::infrastructure::cache::MemoryStore;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::Receiver;

    const TOKEN: &str = "good-token";

    fn directory() -> MockDirectoryApi {
        let mut directory = MockDirectoryApi::new();
        directory.expect_login().returning(|uid, token| LoginResponse {
            error: if token == TOKEN {
                ErrorCode::Success
            } else {
                ErrorCode::TokenInvalid
            },
            uid,
            token: token.to_string(),
        });
        directory
    }

    fn logic(store: &MemoryStore) -> ChatLogic {
        let registry = Arc::new(SessionRegistry::new());
        let reporter = Arc::new(LoadReporter::new(
            "chatserver1",
            Arc::new(store.clone()),
            Arc::clone(&registry),
        ));
        ChatLogic::new(registry, Arc::new(directory()), reporter)
    }

    fn connect(logic: &ChatLogic, id: &str) -> (Arc<Session>, Receiver<Frame>) {
        let (session, queue) = Session::new(id, 16);
        logic.registry().insert(Arc::clone(&session));
        (session, queue)
    }

    async fn login(logic: &ChatLogic, session: &Arc<Session>, uid: i64, token: &str) {
        let frame = Frame::json(
            message_id::CHAT_LOGIN,
            &ChatLoginRequest {
                uid,
                token: token.into(),
            },
        )
        .unwrap();
        logic.dispatch(session, frame).await;
    }

    #[tokio::test]
    async fn test_login_binds_user_and_reports_load() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (session, mut queue) = connect(&logic, "s1");

        login(&logic, &session, 7, TOKEN).await;

        let reply = queue.try_recv().unwrap();
        assert_eq!(reply.id, message_id::CHAT_LOGIN_RSP);
        assert_eq!(
            reply.parse::<ChatLoginResponse>().unwrap(),
            ChatLoginResponse {
                error: ErrorCode::Success,
                uid: 7
            }
        );
        assert_eq!(session.user_id(), Some(7));
        assert!(logic.registry().is_online(7));
        assert_eq!(store.server_load("chatserver1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (session, mut queue) = connect(&logic, "s1");

        login(&logic, &session, 7, "stale").await;

        let reply: ChatLoginResponse = queue.try_recv().unwrap().parse().unwrap();
        assert_eq!(reply.error, ErrorCode::TokenInvalid);
        assert_eq!(session.user_id(), None);
        assert!(!logic.registry().is_online(7));
    }

    #[tokio::test]
    async fn test_malformed_login_body() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (session, mut queue) = connect(&logic, "s1");

        logic
            .dispatch(&session, Frame::new(message_id::CHAT_LOGIN, "not json"))
            .await;

        let reply: ChatLoginResponse = queue.try_recv().unwrap().parse().unwrap();
        assert_eq!(reply.error, ErrorCode::ErrorJson);
    }

    #[tokio::test]
    async fn test_second_login_notifies_and_closes_first_session() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (first, mut first_queue) = connect(&logic, "s1");
        let (second, _second_queue) = connect(&logic, "s2");

        login(&logic, &first, 7, TOKEN).await;
        let _ = first_queue.try_recv();
        login(&logic, &second, 7, TOKEN).await;

        let notice = first_queue.try_recv().unwrap();
        assert_eq!(notice.id, message_id::NOTIFY_OFFLINE);
        assert!(first.is_closing());
        assert_eq!(logic.registry().lookup(7).unwrap().id(), "s2");
        assert_eq!(store.server_load("chatserver1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_session_closed_during_login_keeps_live_session() {
        let store = MemoryStore::new();
        let registry = Arc::new(SessionRegistry::new());
        let (live, _live_queue) = Session::new("live", 16);
        live.bind_user(7);
        registry.register(&live, None).unwrap();

        let (late, _late_queue) = Session::new("late", 16);
        registry.insert(Arc::clone(&late));
        let swept = Arc::clone(&late);
        let mut directory = MockDirectoryApi::new();
        directory.expect_login().returning(move |uid, token| {
            swept.close();
            LoginResponse {
                error: ErrorCode::Success,
                uid,
                token: token.to_string(),
            }
        });
        let reporter = Arc::new(LoadReporter::new(
            "chatserver1",
            Arc::new(store.clone()),
            Arc::clone(&registry),
        ));
        let logic = ChatLogic::new(Arc::clone(&registry), Arc::new(directory), reporter);

        login(&logic, &late, 7, TOKEN).await;

        assert!(!live.is_closing());
        assert_eq!(registry.lookup(7).unwrap().id(), "live");
    }

    #[tokio::test]
    async fn test_heartbeat_is_answered() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (session, mut queue) = connect(&logic, "s1");

        logic
            .dispatch(&session, Frame::new(message_id::HEARTBEAT_REQ, "{}"))
            .await;

        assert_eq!(queue.try_recv().unwrap().id, message_id::HEARTBEAT_RSP);
    }

    #[tokio::test]
    async fn test_text_is_relayed_to_online_recipient() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (alice, mut alice_queue) = connect(&logic, "a");
        let (bob, mut bob_queue) = connect(&logic, "b");
        login(&logic, &alice, 1, TOKEN).await;
        login(&logic, &bob, 2, TOKEN).await;
        let _ = alice_queue.try_recv();
        let _ = bob_queue.try_recv();

        let message = TextChatMsgRequest {
            fromuid: 1,
            touid: 2,
            text_array: vec![TextMessage {
                msgid: "m1".into(),
                content: "hello".into(),
            }],
        };
        logic
            .dispatch(
                &alice,
                Frame::json(message_id::TEXT_CHAT_MSG_REQ, &message).unwrap(),
            )
            .await;

        let relayed = bob_queue.try_recv().unwrap();
        assert_eq!(relayed.id, message_id::NOTIFY_TEXT_CHAT_MSG);
        assert_eq!(relayed.parse::<TextChatMsgRequest>().unwrap(), message);

        let ack: TextChatMsgResponse = alice_queue.try_recv().unwrap().parse().unwrap();
        assert_eq!(
            ack,
            TextChatMsgResponse {
                error: ErrorCode::Success,
                touid: 2,
                delivered: true
            }
        );
    }

    #[tokio::test]
    async fn test_text_to_offline_user_is_not_delivered() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (alice, mut alice_queue) = connect(&logic, "a");
        login(&logic, &alice, 1, TOKEN).await;
        let _ = alice_queue.try_recv();

        let message = TextChatMsgRequest {
            fromuid: 1,
            touid: 99,
            text_array: vec![],
        };
        logic
            .dispatch(
                &alice,
                Frame::json(message_id::TEXT_CHAT_MSG_REQ, &message).unwrap(),
            )
            .await;

        let ack: TextChatMsgResponse = alice_queue.try_recv().unwrap().parse().unwrap();
        assert!(!ack.delivered);
    }

    #[tokio::test]
    async fn test_text_before_login_is_ignored() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (session, mut queue) = connect(&logic, "s1");

        logic
            .dispatch(&session, Frame::new(message_id::TEXT_CHAT_MSG_REQ, "{}"))
            .await;

        assert!(queue.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_session_is_unregistered_and_reported() {
        let store = MemoryStore::new();
        let logic = logic(&store);
        let (session, _queue) = connect(&logic, "s1");
        login(&logic, &session, 7, TOKEN).await;

        logic.on_session_closed(&session).await;

        assert!(!logic.registry().is_online(7));
        assert!(logic.registry().is_empty());
        assert_eq!(store.server_load("chatserver1").await.unwrap(), Some(0));
    }
}
