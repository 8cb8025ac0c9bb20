//! Chat Server Tests
//!
//! Real TCP sessions against a chat server bound to an ephemeral port, with
//! the directory running in-process over a `MemoryStore`.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use chat_backend::application::dto::{
    ChatLoginRequest, ChatLoginResponse, HeartbeatRequest, HeartbeatResponse, NotifyOffline,
    TextChatMsgRequest, TextChatMsgResponse, TextMessage,
};
use chat_backend::application::services::{DirectoryApi, DirectoryService};
use chat_backend::config::ChatSettings;
use chat_backend::domain::LoadStore;
use chat_backend::infrastructure::cache::MemoryStore;
use chat_backend::presentation::tcp::{message_id, ChatServer, SessionRegistry};
use chat_backend::shared::ErrorCode;

use crate::common::{directory_over, ChatClient};

const SERVER: &str = "chatserver1";

struct RunningChat {
    addr: SocketAddr,
    registry: Arc<SessionRegistry>,
    directory: Arc<DirectoryService>,
    store: MemoryStore,
    stop: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl RunningChat {
    async fn start() -> Self {
        let store = MemoryStore::new();
        let directory = directory_over(&store, &[(SERVER, 8090)]);
        let settings = ChatSettings {
            name: SERVER.into(),
            host: "127.0.0.1".into(),
            port: 0,
            workers: 2,
            max_body_len: 2048,
            max_send_queue: 64,
            heartbeat_timeout_secs: 60,
            write_timeout_secs: 5,
            sweep_interval_secs: 60,
        };

        let server = ChatServer::bind(
            settings,
            Arc::clone(&directory) as Arc<dyn DirectoryApi>,
            Arc::new(store.clone()) as Arc<dyn LoadStore>,
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until_stopped(async {
            let _ = stopped.await;
        }));

        Self {
            addr,
            registry,
            directory,
            store,
            stop,
            task,
        }
    }

    /// Connect and log in with a freshly issued token.
    async fn login(&self, uid: i64) -> ChatClient {
        let handoff = self.directory.get_chat_server(uid).await;
        assert_eq!(handoff.error, ErrorCode::Success);

        let mut client = ChatClient::connect(self.addr).await;
        client
            .send(
                message_id::CHAT_LOGIN,
                &ChatLoginRequest {
                    uid,
                    token: handoff.token,
                },
            )
            .await;
        let reply: ChatLoginResponse = client.expect(message_id::CHAT_LOGIN_RSP).await;
        assert_eq!(
            reply,
            ChatLoginResponse {
                error: ErrorCode::Success,
                uid
            }
        );
        client
    }

    async fn wait_for_load(&self, expected: Option<u32>) {
        for _ in 0..100 {
            if self.store.server_load(SERVER).await.unwrap() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "load stayed at {:?}, expected {:?}",
            self.store.server_load(SERVER).await.unwrap(),
            expected
        );
    }

    async fn shutdown(self) -> MemoryStore {
        let _ = self.stop.send(());
        self.task.await.unwrap().unwrap();
        self.store
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_heartbeat_and_load_report() {
    let chat = RunningChat::start().await;
    chat.wait_for_load(Some(0)).await;

    let mut client = chat.login(7).await;
    assert!(chat.registry.is_online(7));
    chat.wait_for_load(Some(1)).await;

    client
        .send(message_id::HEARTBEAT_REQ, &HeartbeatRequest { fromuid: Some(7) })
        .await;
    let reply: HeartbeatResponse = client.expect(message_id::HEARTBEAT_RSP).await;
    assert_eq!(reply.error, ErrorCode::Success);

    drop(client);
    chat.wait_for_load(Some(0)).await;
    assert!(!chat.registry.is_online(7));

    let store = chat.shutdown().await;
    assert_eq!(store.server_load(SERVER).await.unwrap(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bad_token_is_rejected() {
    let chat = RunningChat::start().await;
    chat.directory.get_chat_server(8).await;

    let mut client = ChatClient::connect(chat.addr).await;
    client
        .send(
            message_id::CHAT_LOGIN,
            &ChatLoginRequest {
                uid: 8,
                token: "forged".into(),
            },
        )
        .await;
    let reply: ChatLoginResponse = client.expect(message_id::CHAT_LOGIN_RSP).await;
    assert_eq!(reply.error, ErrorCode::TokenInvalid);
    assert!(!chat.registry.is_online(8));

    chat.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_text_message_is_relayed() {
    let chat = RunningChat::start().await;
    let mut alice = chat.login(1).await;
    let mut bob = chat.login(2).await;

    let request = TextChatMsgRequest {
        fromuid: 1,
        touid: 2,
        text_array: vec![TextMessage {
            msgid: "m-1".into(),
            content: "hello bob".into(),
        }],
    };
    alice.send(message_id::TEXT_CHAT_MSG_REQ, &request).await;

    let relayed: TextChatMsgRequest = bob.expect(message_id::NOTIFY_TEXT_CHAT_MSG).await;
    assert_eq!(relayed, request);

    let ack: TextChatMsgResponse = alice.expect(message_id::TEXT_CHAT_MSG_RSP).await;
    assert_eq!(
        ack,
        TextChatMsgResponse {
            error: ErrorCode::Success,
            touid: 2,
            delivered: true
        }
    );

    // Recipient not connected here.
    let request = TextChatMsgRequest {
        touid: 99,
        ..request
    };
    alice.send(message_id::TEXT_CHAT_MSG_REQ, &request).await;
    let ack: TextChatMsgResponse = alice.expect(message_id::TEXT_CHAT_MSG_RSP).await;
    assert!(!ack.delivered);

    chat.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_login_evicts_first_session() {
    let chat = RunningChat::start().await;
    let mut first = chat.login(5).await;
    let _second = chat.login(5).await;

    let notice: NotifyOffline = first.expect(message_id::NOTIFY_OFFLINE).await;
    assert_eq!(
        notice,
        NotifyOffline {
            error: ErrorCode::Success,
            uid: 5
        }
    );
    assert!(first.closed().await);
    assert!(chat.registry.is_online(5));
    chat.wait_for_load(Some(1)).await;

    chat.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_closes_open_sessions() {
    let chat = RunningChat::start().await;
    let mut client = chat.login(3).await;

    let store = chat.shutdown().await;
    assert!(client.closed().await);
    assert_eq!(store.server_load(SERVER).await.unwrap(), None);
}
