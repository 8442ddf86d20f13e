//! Message delivery: persistence, translation, notification and broadcast for
//! every inbound message.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use lingo_db::Database;
use lingo_db::models::{NewMessage, UserRow};
use lingo_gateway::Broadcaster;
use lingo_types::events::GatewayEvent;
use lingo_types::models::{
    AttachmentKind, ChatMessage, ConversationKey, Language, MessagePayload, Notification, Participant,
};

use crate::error::{ApiError, ApiResult};
use crate::intent::IntentClassifier;
use crate::records;
use crate::state::with_db;
use crate::translate::Translator;

pub const DEFAULT_TRANSLATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one send. `messages` holds one record on the user path and the
/// inbound message plus the assistant's reply on the bot path.
#[derive(Debug)]
pub struct Delivery {
    pub messages: Vec<ChatMessage>,
    pub notification: Option<Notification>,
    /// False only when a translation was requested and could not be produced.
    pub translations_available: bool,
}

#[derive(Clone)]
pub struct MessageDispatcher {
    inner: Arc<DispatcherInner>,
    translate_timeout: Duration,
}

struct DispatcherInner {
    db: Arc<Database>,
    broadcaster: Broadcaster,
    translator: Arc<dyn Translator>,
    classifier: Arc<dyn IntentClassifier>,
}

impl MessageDispatcher {
    pub fn new(
        db: Arc<Database>,
        broadcaster: Broadcaster,
        translator: Arc<dyn Translator>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                db,
                broadcaster,
                translator,
                classifier,
            }),
            translate_timeout: DEFAULT_TRANSLATE_TIMEOUT,
        }
    }

    /// Bound on a single translation call. Hitting it counts as a failed
    /// translation.
    pub fn with_translate_timeout(mut self, timeout: Duration) -> Self {
        self.translate_timeout = timeout;
        self
    }

    /// Deliver a text message. The receiver decides the path: the assistant
    /// answers with a canned reply, a user gets a (possibly translated)
    /// message plus a notification.
    pub async fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        text: String,
        target_language: Option<&str>,
    ) -> ApiResult<Delivery> {
        let sender = parse_participant(sender, "sender")?;
        let receiver = parse_participant(receiver, "receiver")?;
        if text.trim().is_empty() {
            return Err(ApiError::validation("message is required"));
        }

        match receiver {
            Participant::Bot => self.converse_with_bot(sender, text).await,
            Participant::User(receiver_id) => {
                self.deliver_text(sender, receiver_id, text, target_language)
                    .await
            }
        }
    }

    async fn converse_with_bot(&self, sender: Participant, text: String) -> ApiResult<Delivery> {
        if sender.is_bot() {
            return Err(ApiError::validation("chatbot cannot message itself"));
        }

        let inbound = self
            .store_message(sender, Participant::Bot, MessagePayload::Text { text: text.clone() })
            .await?;

        let intent = self
            .inner
            .classifier
            .classify(&text)
            .await
            .map_err(ApiError::Adapter)?;
        debug!("Classified message {} as {:?}", inbound.id, intent);

        let reply = self
            .store_message(
                Participant::Bot,
                sender,
                MessagePayload::Text {
                    text: intent.reply().to_string(),
                },
            )
            .await?;

        self.publish(GatewayEvent::Message(inbound.clone()));
        self.publish(GatewayEvent::Message(reply.clone()));

        info!("{} talked to chatbot ({:?})", sender, intent);
        Ok(Delivery {
            messages: vec![inbound, reply],
            notification: None,
            translations_available: true,
        })
    }

    async fn deliver_text(
        &self,
        sender: Participant,
        receiver_id: Uuid,
        text: String,
        target_language: Option<&str>,
    ) -> ApiResult<Delivery> {
        let sender_row = self.resolve_user(sender).await?.ok_or(ApiError::SenderNotFound)?;
        if self.resolve_user(Participant::User(receiver_id)).await?.is_none() {
            return Err(ApiError::ReceiverNotFound);
        }
        let language: Language = target_language
            .ok_or_else(|| ApiError::validation("targetLanguage is required"))?
            .parse()?;

        let (stored_text, translations_available) = self.translate_or_fallback(&text, language).await;
        let translated = stored_text != text;

        let message = self
            .store_message(
                sender,
                Participant::User(receiver_id),
                MessagePayload::Text { text: stored_text },
            )
            .await?;

        let note = format!(
            "You got a {} message from {}",
            if translated { "translated" } else { "new" },
            sender_row.username
        );
        let notification = self.store_notification(receiver_id, &sender_row, note).await?;

        self.publish(GatewayEvent::Message(message.clone()));
        self.publish(GatewayEvent::Notification(notification.clone()));

        let online = self.inner.broadcaster.is_online(receiver_id).await;
        info!(
            "{} -> {} delivered (lang={}, translated={}, online={})",
            sender, receiver_id, language, translated, online
        );
        Ok(Delivery {
            messages: vec![message],
            notification: Some(notification),
            translations_available,
        })
    }

    /// Deliver an already-uploaded file. Attachments are never translated and
    /// always notify the receiver.
    pub async fn send_attachment(
        &self,
        sender: &str,
        receiver: &str,
        kind: AttachmentKind,
        file_url: String,
    ) -> ApiResult<Delivery> {
        let sender = parse_participant(sender, "sender")?;
        let receiver = parse_participant(receiver, "receiver")?;
        if file_url.trim().is_empty() {
            return Err(ApiError::validation("fileUrl is required"));
        }
        let Participant::User(receiver_id) = receiver else {
            return Err(ApiError::validation("attachments cannot be sent to chatbot"));
        };

        let sender_row = self.resolve_user(sender).await?.ok_or(ApiError::SenderNotFound)?;
        if self.resolve_user(receiver).await?.is_none() {
            return Err(ApiError::ReceiverNotFound);
        }

        let message = self
            .store_message(sender, receiver, MessagePayload::attachment(kind, file_url))
            .await?;
        let note = format!("You got {} from {}", kind.describe(), sender_row.username);
        let notification = self.store_notification(receiver_id, &sender_row, note).await?;

        self.publish(GatewayEvent::Message(message.clone()));
        self.publish(GatewayEvent::Notification(notification.clone()));

        let online = self.inner.broadcaster.is_online(receiver_id).await;
        info!("{} -> {} delivered {:?} (online={})", sender, receiver_id, kind, online);
        Ok(Delivery {
            messages: vec![message],
            notification: Some(notification),
            translations_available: true,
        })
    }

    /// Translate unless the target is the default language. Failures and
    /// timeouts fall back to the original text and report `false`.
    async fn translate_or_fallback(&self, text: &str, language: Language) -> (String, bool) {
        if language.is_default() {
            return (text.to_string(), true);
        }

        let call = self.inner.translator.translate(text, language);
        match tokio::time::timeout(self.translate_timeout, call).await {
            Ok(Ok(translated)) => (translated, true),
            Ok(Err(e)) => {
                warn!("Translation to {} failed, sending original text: {:#}", language, e);
                (text.to_string(), false)
            }
            Err(_) => {
                warn!(
                    "Translation to {} timed out after {:?}, sending original text",
                    language, self.translate_timeout
                );
                (text.to_string(), false)
            }
        }
    }

    async fn resolve_user(&self, participant: Participant) -> ApiResult<Option<UserRow>> {
        let Some(id) = participant.user_id() else {
            return Ok(None);
        };
        with_db(&self.inner.db, move |db| db.get_user_by_id(&id.to_string())).await
    }

    async fn store_message(
        &self,
        sender: Participant,
        receiver: Participant,
        payload: MessagePayload,
    ) -> ApiResult<ChatMessage> {
        let id = Uuid::new_v4();
        let (created_at, stamp) = records::now();
        let key = ConversationKey::new(&sender, &receiver);

        let row_id = id.to_string();
        let row_sender = sender.to_string();
        let row_receiver = receiver.to_string();
        let kind = payload.kind();
        let body = payload.body().to_string();

        let snapshot = with_db(&self.inner.db, move |db| {
            db.insert_message(&NewMessage {
                id: &row_id,
                conversation_key: key.as_str(),
                sender: &row_sender,
                receiver: &row_receiver,
                kind,
                body: &body,
                created_at: &stamp,
            })
        })
        .await?;

        Ok(ChatMessage {
            id,
            sender,
            receiver,
            payload,
            theme: snapshot.map(records::theme_from_row),
            created_at,
        })
    }

    async fn store_notification(
        &self,
        user_id: Uuid,
        sender: &UserRow,
        message: String,
    ) -> ApiResult<Notification> {
        let id = Uuid::new_v4();
        let (created_at, stamp) = records::now();
        let sender_id: Uuid = sender
            .id
            .parse()
            .map_err(|e| ApiError::Internal(format!("corrupt user id '{}': {}", sender.id, e)))?;

        let text = message.clone();
        with_db(&self.inner.db, move |db| {
            db.insert_notification(
                &id.to_string(),
                &user_id.to_string(),
                &sender_id.to_string(),
                &text,
                &stamp,
            )
        })
        .await?;

        Ok(Notification {
            id,
            user_id,
            sender_id,
            message,
            is_read: false,
            created_at,
        })
    }

    fn publish(&self, event: GatewayEvent) {
        self.inner.broadcaster.publish(event);
    }
}

pub(crate) fn parse_participant(raw: &str, role: &str) -> ApiResult<Participant> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("invalid {} id '{}'", role, raw)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use lingo_db::models::ThemeRow;

    use super::*;
    use crate::intent::Intent;

    /// Translator that counts calls and either prefixes the text or fails.
    struct FakeTranslator {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeTranslator {
        fn working() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: false })
        }

        fn broken() -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), fail: true })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(&self, text: &str, target: Language) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("translation service unavailable"));
            }
            Ok(format!("[{}] {}", target, text))
        }
    }

    /// Translator that echoes the input unchanged.
    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, text: &str, _target: Language) -> Result<String> {
            Ok(text.to_string())
        }
    }

    struct StallingTranslator;

    #[async_trait]
    impl Translator for StallingTranslator {
        async fn translate(&self, text: &str, _target: Language) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(text.to_string())
        }
    }

    struct FixedClassifier(Intent);

    #[async_trait]
    impl IntentClassifier for FixedClassifier {
        async fn classify(&self, _text: &str) -> Result<Intent> {
            Ok(self.0)
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl IntentClassifier for FailingClassifier {
        async fn classify(&self, _text: &str) -> Result<Intent> {
            Err(anyhow!("wit.ai returned 500"))
        }
    }

    struct Fixture {
        db: Arc<Database>,
        broadcaster: Broadcaster,
        u1: Uuid,
        u2: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Arc::new(Database::open_in_memory().unwrap());
            let u1 = Uuid::new_v4();
            let u2 = Uuid::new_v4();
            for (id, name) in [(u1, "alice"), (u2, "bob")] {
                db.create_user(
                    &id.to_string(),
                    name,
                    &format!("{}@example.com", name),
                    "hash",
                    &records::now().1,
                )
                .unwrap();
            }
            Self { db, broadcaster: Broadcaster::new(), u1, u2 }
        }

        fn dispatcher(&self, translator: Arc<dyn Translator>, classifier: Arc<dyn IntentClassifier>) -> MessageDispatcher {
            MessageDispatcher::new(self.db.clone(), self.broadcaster.clone(), translator, classifier)
        }

        fn default_dispatcher(&self) -> MessageDispatcher {
            self.dispatcher(FakeTranslator::working(), Arc::new(FixedClassifier(Intent::Greet)))
        }

        fn history(&self, a: Participant, b: Participant) -> Vec<ChatMessage> {
            let key = ConversationKey::new(&a, &b);
            self.db
                .get_conversation(key.as_str())
                .unwrap()
                .into_iter()
                .filter_map(records::message_from_row)
                .collect()
        }

        fn unread(&self, user: Uuid) -> Vec<String> {
            self.db
                .get_unread_notifications(&user.to_string())
                .unwrap()
                .into_iter()
                .map(|n| n.message)
                .collect()
        }
    }

    #[tokio::test]
    async fn english_send_skips_translation_and_notifies() {
        let fx = Fixture::new();
        let translator = FakeTranslator::working();
        let dispatcher = fx.dispatcher(translator.clone(), Arc::new(FixedClassifier(Intent::Greet)));

        let delivery = dispatcher
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "hi".into(), Some("en"))
            .await
            .unwrap();

        assert_eq!(translator.calls(), 0);
        assert!(delivery.translations_available);
        assert_eq!(delivery.messages.len(), 1);
        assert_eq!(delivery.messages[0].payload.text(), Some("hi"));

        let history = fx.history(Participant::User(fx.u1), Participant::User(fx.u2));
        assert_eq!(history, delivery.messages);

        assert_eq!(fx.unread(fx.u2), ["You got a new message from alice"]);
        assert!(fx.unread(fx.u1).is_empty());
    }

    #[tokio::test]
    async fn successful_translation_is_stored_and_announced() {
        let fx = Fixture::new();
        let translator = FakeTranslator::working();
        let dispatcher = fx.dispatcher(translator.clone(), Arc::new(FixedClassifier(Intent::Greet)));

        let delivery = dispatcher
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "good morning".into(), Some("fr"))
            .await
            .unwrap();

        assert_eq!(translator.calls(), 1);
        assert!(delivery.translations_available);
        assert_eq!(delivery.messages[0].payload.text(), Some("[fr] good morning"));
        assert_eq!(
            delivery.notification.unwrap().message,
            "You got a translated message from alice"
        );
    }

    #[tokio::test]
    async fn failed_translation_degrades_to_original_text() {
        let fx = Fixture::new();
        let translator = FakeTranslator::broken();
        let dispatcher = fx.dispatcher(translator.clone(), Arc::new(FixedClassifier(Intent::Greet)));

        let delivery = dispatcher
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "hola".into(), Some("es"))
            .await
            .unwrap();

        assert_eq!(translator.calls(), 1);
        assert!(!delivery.translations_available);
        assert_eq!(delivery.messages[0].payload.text(), Some("hola"));
        assert_eq!(fx.unread(fx.u2), ["You got a new message from alice"]);
    }

    #[tokio::test]
    async fn translation_timeout_counts_as_failure() {
        let fx = Fixture::new();
        let dispatcher = fx
            .dispatcher(Arc::new(StallingTranslator), Arc::new(FixedClassifier(Intent::Greet)))
            .with_translate_timeout(Duration::from_millis(50));

        let delivery = dispatcher
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "hallo".into(), Some("de"))
            .await
            .unwrap();

        assert!(!delivery.translations_available);
        assert_eq!(delivery.messages[0].payload.text(), Some("hallo"));
    }

    #[tokio::test]
    async fn identical_translation_reads_as_new_message() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(Arc::new(EchoTranslator), Arc::new(FixedClassifier(Intent::Greet)));

        let delivery = dispatcher
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "pizza".into(), Some("it"))
            .await
            .unwrap();

        assert!(delivery.translations_available);
        assert_eq!(delivery.notification.unwrap().message, "You got a new message from alice");
    }

    #[tokio::test]
    async fn bot_path_stores_two_records_and_no_notification() {
        let fx = Fixture::new();
        let dispatcher = fx.default_dispatcher();

        let delivery = dispatcher
            .send_message(&fx.u1.to_string(), "chatbot", "hello".into(), None)
            .await
            .unwrap();

        assert!(delivery.translations_available);
        assert!(delivery.notification.is_none());
        assert_eq!(delivery.messages.len(), 2);

        let reply = &delivery.messages[1];
        assert_eq!(reply.sender, Participant::Bot);
        assert_eq!(reply.receiver, Participant::User(fx.u1));
        assert_eq!(reply.payload.text(), Some("Hello! How can I help you today?"));

        let history = fx.history(Participant::User(fx.u1), Participant::Bot);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].payload.text(), Some("hello"));
        assert!(fx.unread(fx.u1).is_empty());
    }

    #[tokio::test]
    async fn bot_path_falls_back_for_unknown_intent() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(FakeTranslator::working(), Arc::new(FixedClassifier(Intent::Unknown)));

        let delivery = dispatcher
            .send_message(&fx.u1.to_string(), "chatbot", "tell me a joke".into(), Some("fr"))
            .await
            .unwrap();

        assert_eq!(
            delivery.messages[1].payload.text(),
            Some("I'm not sure how to respond to that. Can you please rephrase?")
        );
        // Bot conversations are never translated.
        assert_eq!(delivery.messages[0].payload.text(), Some("tell me a joke"));
    }

    #[tokio::test]
    async fn classifier_failure_surfaces_as_adapter_error() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(FakeTranslator::working(), Arc::new(FailingClassifier));

        let err = dispatcher
            .send_message(&fx.u1.to_string(), "chatbot", "hello".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Adapter(_)));
    }

    #[tokio::test]
    async fn bot_cannot_message_itself() {
        let fx = Fixture::new();
        let err = fx
            .default_dispatcher()
            .send_message("chatbot", "chatbot", "hello".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn unsupported_language_persists_nothing() {
        let fx = Fixture::new();
        let translator = FakeTranslator::working();
        let dispatcher = fx.dispatcher(translator.clone(), Arc::new(FixedClassifier(Intent::Greet)));

        let err = dispatcher
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "hi".into(), Some("xx"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedLanguage(_)));

        let err = dispatcher
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "hi".into(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        assert_eq!(translator.calls(), 0);
        assert!(fx.history(Participant::User(fx.u1), Participant::User(fx.u2)).is_empty());
        assert!(fx.unread(fx.u2).is_empty());
    }

    #[tokio::test]
    async fn unknown_participants_are_not_found() {
        let fx = Fixture::new();
        let dispatcher = fx.default_dispatcher();
        let ghost = Uuid::new_v4().to_string();

        let err = dispatcher
            .send_message(&ghost, &fx.u2.to_string(), "hi".into(), Some("en"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SenderNotFound));

        let err = dispatcher
            .send_message("chatbot", &fx.u2.to_string(), "hi".into(), Some("en"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SenderNotFound));

        let err = dispatcher
            .send_message(&fx.u1.to_string(), &ghost, "hi".into(), Some("en"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ReceiverNotFound));

        let err = dispatcher
            .send_message("u1", &fx.u2.to_string(), "hi".into(), Some("en"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let fx = Fixture::new();
        let err = fx
            .default_dispatcher()
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "   ".into(), Some("en"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn attachments_notify_and_never_translate() {
        let fx = Fixture::new();
        let translator = FakeTranslator::working();
        let dispatcher = fx.dispatcher(translator.clone(), Arc::new(FixedClassifier(Intent::Greet)));

        for (kind, url, note) in [
            (AttachmentKind::Image, "/uploads/a.png", "You got an image from alice"),
            (AttachmentKind::Document, "/uploads/b.pdf", "You got a document from alice"),
            (AttachmentKind::Voice, "/uploads/c.webm", "You got a voice message from alice"),
        ] {
            let delivery = dispatcher
                .send_attachment(&fx.u1.to_string(), &fx.u2.to_string(), kind, url.into())
                .await
                .unwrap();
            assert_eq!(delivery.messages[0].payload, MessagePayload::attachment(kind, url.into()));
            assert_eq!(delivery.notification.unwrap().message, note);
        }

        assert_eq!(translator.calls(), 0);
        assert_eq!(fx.unread(fx.u2).len(), 3);
    }

    #[tokio::test]
    async fn attachment_errors() {
        let fx = Fixture::new();
        let dispatcher = fx.default_dispatcher();

        let err = dispatcher
            .send_attachment(&Uuid::new_v4().to_string(), &fx.u2.to_string(), AttachmentKind::Image, "/uploads/x.png".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SenderNotFound));

        let err = dispatcher
            .send_attachment(&fx.u1.to_string(), "chatbot", AttachmentKind::Image, "/uploads/x.png".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = dispatcher
            .send_attachment(&fx.u1.to_string(), &fx.u2.to_string(), AttachmentKind::Voice, " ".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn messages_carry_theme_snapshot() {
        let fx = Fixture::new();
        let key = ConversationKey::new(&Participant::User(fx.u2), &Participant::User(fx.u1));
        fx.db
            .upsert_theme(
                key.as_str(),
                &ThemeRow {
                    name: "Dark Mode".into(),
                    background_color: "#000".into(),
                    text_color: "#fff".into(),
                },
                &records::now().1,
            )
            .unwrap();

        let delivery = fx
            .default_dispatcher()
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "hi".into(), Some("en"))
            .await
            .unwrap();
        assert_eq!(delivery.messages[0].theme.as_ref().unwrap().name, "Dark Mode");
    }

    #[tokio::test]
    async fn deliveries_are_broadcast_in_write_order() {
        let fx = Fixture::new();
        let mut sub = fx.broadcaster.connect(fx.u2).await;
        let dispatcher = fx.default_dispatcher();

        let delivery = dispatcher
            .send_message(&fx.u1.to_string(), &fx.u2.to_string(), "hi".into(), Some("en"))
            .await
            .unwrap();

        match sub.events.recv().await.unwrap() {
            GatewayEvent::Message(m) => assert_eq!(m.id, delivery.messages[0].id),
            other => panic!("expected message, got {:?}", other),
        }
        match sub.events.recv().await.unwrap() {
            GatewayEvent::Notification(n) => assert_eq!(Some(n.id), delivery.notification.map(|n| n.id)),
            other => panic!("expected notification, got {:?}", other),
        }

        dispatcher
            .send_message(&fx.u1.to_string(), "chatbot", "thanks".into(), None)
            .await
            .unwrap();
        for expected_sender in [Participant::User(fx.u1), Participant::Bot] {
            match sub.events.recv().await.unwrap() {
                GatewayEvent::Message(m) => assert_eq!(m.sender, expected_sender),
                other => panic!("expected message, got {:?}", other),
            }
        }
        assert!(sub.events.try_recv().is_err());
    }
}
