//! The relay loop.
//!
//! One relay serves one client channel for its whole lifetime: wait for a
//! question, open a streaming completion upstream, forward content
//! fragments as they decode, close the turn with the done envelope, and
//! loop. The loop ends when the client channel drains; it aborts when the
//! client goes away mid-delivery or the upstream cannot be reached at all.

use tracing::{debug, info, warn};

use banter_openai::{ChatStream, Frame};

use crate::channel::Channel;
use crate::conversation::Conversation;
use crate::envelope::{ClientRequest, Reply};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Tunables for a relay, fixed at construction.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Completion budget requested from the upstream on every turn.
    pub max_tokens: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { max_tokens: 1024 }
    }
}

/// Bridges one client channel to the upstream completion API.
pub struct Relay<C, T> {
    channel: C,
    transport: T,
    config: RelayConfig,
    conversation: Conversation,
}

impl<C: Channel, T: Transport> Relay<C, T> {
    /// Create a relay with an empty, unbounded conversation.
    pub fn new(channel: C, transport: T, config: RelayConfig) -> Self {
        Self {
            channel,
            transport,
            config,
            conversation: Conversation::new(),
        }
    }

    /// Replace the conversation, e.g. to bound its growth.
    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = conversation;
        self
    }

    /// The turns committed so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Serve the channel until the client is done.
    ///
    /// Returns `Ok` when the inbound side drains. An error means the relay
    /// aborted: the client vanished mid-delivery, or the upstream refused a
    /// stream outright.
    pub async fn run(&mut self) -> Result<()> {
        while let Some(request) = self.channel.recv().await {
            if request.question.is_empty() {
                debug!(index = request.index, "discarding empty question");
                continue;
            }
            self.serve_turn(request).await?;
        }
        info!("client channel drained");
        Ok(())
    }

    async fn serve_turn(&mut self, request: ClientRequest) -> Result<()> {
        self.conversation.push_user(request.question.clone());
        let stream = match self
            .transport
            .open_stream(self.conversation.turns(), self.config.max_tokens)
            .await
        {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "could not open upstream stream");
                return Err(err.into());
            }
        };

        let answer = self.deliver(stream, &request).await?;
        self.conversation.push_assistant(answer);
        self.channel
            .send(Reply::done())
            .await
            .map_err(|_| Error::ConnectionClosed)?;
        debug!(
            index = request.index,
            turns = self.conversation.len(),
            "turn complete"
        );
        Ok(())
    }

    /// Forward fragments until the stream ends, returning the full answer.
    ///
    /// The stream is dropped on return, releasing the upstream connection
    /// even when the sentinel never arrived.
    async fn deliver(&mut self, mut stream: ChatStream, request: &ClientRequest) -> Result<String> {
        let mut answer = String::new();
        let mut delivered = 0usize;
        loop {
            let frame = match stream.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    // A bad frame or read failure ends this turn with
                    // whatever was already delivered; the relay lives on.
                    warn!(error = %err, "upstream stream ended early");
                    break;
                }
            };
            let chunk = match frame {
                Frame::Event(chunk) => chunk,
                Frame::Skip => continue,
                Frame::Done => break,
            };
            for choice in &chunk.choices {
                // The first chunk usually just announces the assistant role.
                let content = choice.delta.content.as_deref().unwrap_or_default();
                if delivered == 0 && is_leading_filler(content) {
                    continue;
                }
                delivered += 1;
                answer.push_str(content);
                self.channel
                    .send(Reply::fragment(request, content))
                    .await
                    .map_err(|_| Error::ConnectionClosed)?;
            }
        }
        Ok(answer)
    }
}

/// Content the upstream tends to emit before the answer proper.
fn is_leading_filler(content: &str) -> bool {
    content.is_empty() || content == "\n\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelClosed;
    use crate::conversation::KeepRecent;
    use async_trait::async_trait;
    use banter_openai::{ChatMessage, Role};
    use std::collections::VecDeque;
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    struct ScriptedChannel {
        inbound: VecDeque<ClientRequest>,
        sent: Arc<Mutex<Vec<Reply>>>,
        send_budget: Option<usize>,
    }

    impl ScriptedChannel {
        fn new(questions: &[(i64, &str)]) -> (Self, Arc<Mutex<Vec<Reply>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            let channel = Self {
                inbound: questions
                    .iter()
                    .map(|(index, question)| ClientRequest {
                        index: *index,
                        question: question.to_string(),
                    })
                    .collect(),
                sent: Arc::clone(&sent),
                send_budget: None,
            };
            (channel, sent)
        }

        fn failing_after(mut self, sends: usize) -> Self {
            self.send_budget = Some(sends);
            self
        }
    }

    #[async_trait]
    impl Channel for ScriptedChannel {
        async fn recv(&mut self) -> Option<ClientRequest> {
            self.inbound.pop_front()
        }

        async fn send(&mut self, reply: Reply) -> std::result::Result<(), ChannelClosed> {
            if let Some(budget) = &mut self.send_budget {
                if *budget == 0 {
                    return Err(ChannelClosed);
                }
                *budget -= 1;
            }
            self.sent.lock().unwrap().push(reply);
            Ok(())
        }
    }

    enum Script {
        Body(String),
        Fail,
    }

    struct MockTransport {
        scripts: Mutex<VecDeque<Script>>,
        seen_turns: Arc<Mutex<Vec<usize>>>,
        drops: Arc<AtomicUsize>,
    }

    impl MockTransport {
        fn new(scripts: Vec<Script>) -> (Self, Arc<Mutex<Vec<usize>>>, Arc<AtomicUsize>) {
            let seen_turns = Arc::new(Mutex::new(Vec::new()));
            let drops = Arc::new(AtomicUsize::new(0));
            let transport = Self {
                scripts: Mutex::new(scripts.into()),
                seen_turns: Arc::clone(&seen_turns),
                drops: Arc::clone(&drops),
            };
            (transport, seen_turns, drops)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open_stream(
            &self,
            turns: &[ChatMessage],
            _max_tokens: u32,
        ) -> banter_openai::Result<ChatStream> {
            self.seen_turns.lock().unwrap().push(turns.len());
            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                Some(Script::Body(body)) => Ok(ChatStream::new(TrackReader {
                    inner: Cursor::new(body.into_bytes()),
                    drops: Arc::clone(&self.drops),
                })),
                Some(Script::Fail) => {
                    Err(banter_openai::Error::api(500, "upstream unavailable"))
                }
                None => panic!("transport called more times than scripted"),
            }
        }
    }

    /// Counts drops so tests can verify the stream is released.
    struct TrackReader<R> {
        inner: R,
        drops: Arc<AtomicUsize>,
    }

    impl<R: AsyncRead + Unpin> AsyncRead for TrackReader<R> {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
        }
    }

    impl<R> Drop for TrackReader<R> {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn chunk_line(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}},\"finish_reason\":null}}]}}\n",
            serde_json::to_string(content).unwrap()
        )
    }

    fn body(fragments: &[&str]) -> String {
        let mut body: String = fragments.iter().map(|f| chunk_line(f)).collect();
        body.push_str("data: [DONE]\n");
        body
    }

    fn fragment(index: i64, question: &str, answer: &str) -> Reply {
        Reply::fragment(
            &ClientRequest {
                index,
                question: question.to_string(),
            },
            answer,
        )
    }

    #[tokio::test]
    async fn relays_fragments_and_commits_assistant_turn() {
        let (channel, sent) = ScriptedChannel::new(&[(1, "hi")]);
        let stream_body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"},\"finish_reason\":null}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" there\"},\"finish_reason\":null}]}\n",
            "data: [DONE]\n",
        );
        let (transport, _, _) = MockTransport::new(vec![Script::Body(stream_body.to_string())]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![
                fragment(1, "hi", "Hello"),
                fragment(1, "hi", " there"),
                Reply::done(),
            ]
        );
        let turns = relay.conversation().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hi");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "Hello there");
    }

    #[tokio::test]
    async fn empty_question_is_discarded() {
        let (channel, sent) = ScriptedChannel::new(&[(1, ""), (2, "hi")]);
        let (transport, seen_turns, _) =
            MockTransport::new(vec![Script::Body(body(&["ok"]))]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        assert_eq!(*seen_turns.lock().unwrap(), vec![1]);
        assert_eq!(
            *sent.lock().unwrap(),
            vec![fragment(2, "hi", "ok"), Reply::done()]
        );
        assert_eq!(relay.conversation().len(), 2);
    }

    #[tokio::test]
    async fn leading_filler_is_filtered_once() {
        let (channel, sent) = ScriptedChannel::new(&[(1, "hi")]);
        let (transport, _, _) =
            MockTransport::new(vec![Script::Body(body(&["", "\n\n", "Hi", "", "!"]))]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![
                fragment(1, "hi", "Hi"),
                fragment(1, "hi", ""),
                fragment(1, "hi", "!"),
                Reply::done(),
            ]
        );
        assert_eq!(relay.conversation().turns()[1].content, "Hi!");
    }

    #[tokio::test]
    async fn decode_error_ends_the_turn_not_the_relay() {
        let (channel, sent) = ScriptedChannel::new(&[(1, "first"), (2, "second")]);
        let mut broken = chunk_line("Hel");
        broken.push_str("data: {broken\n");
        broken.push_str(&chunk_line("never seen"));
        let (transport, _, _) = MockTransport::new(vec![
            Script::Body(broken),
            Script::Body(body(&["again"])),
        ]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![
                fragment(1, "first", "Hel"),
                Reply::done(),
                fragment(2, "second", "again"),
                Reply::done(),
            ]
        );
        let turns = relay.conversation().turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[1].content, "Hel");
        assert_eq!(turns[3].content, "again");
    }

    #[tokio::test]
    async fn upstream_open_failure_ends_the_relay() {
        let (channel, sent) = ScriptedChannel::new(&[(1, "hi"), (2, "never served")]);
        let (transport, _, _) = MockTransport::new(vec![Script::Fail]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        let err = relay.run().await.unwrap_err();

        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("500"));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_failure_aborts_delivery() {
        let (channel, sent) = ScriptedChannel::new(&[(1, "hi")]);
        let channel = channel.failing_after(1);
        let (transport, _, drops) =
            MockTransport::new(vec![Script::Body(body(&["a", "b", "c"]))]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        let err = relay.run().await.unwrap_err();

        assert!(matches!(err, Error::ConnectionClosed));
        assert_eq!(*sent.lock().unwrap(), vec![fragment(1, "hi", "a")]);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn conversation_context_grows_across_turns() {
        let (channel, _) = ScriptedChannel::new(&[(1, "one"), (2, "two")]);
        let (transport, seen_turns, _) = MockTransport::new(vec![
            Script::Body(body(&["1"])),
            Script::Body(body(&["2"])),
        ]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        // Second turn carries the first question and answer as context.
        assert_eq!(*seen_turns.lock().unwrap(), vec![1, 3]);
        assert_eq!(relay.conversation().len(), 4);
    }

    #[tokio::test]
    async fn content_after_the_sentinel_is_not_forwarded() {
        let (channel, sent) = ScriptedChannel::new(&[(1, "hi")]);
        let mut stream_body = body(&["A"]);
        stream_body.push_str(&chunk_line("B"));
        let (transport, _, _) = MockTransport::new(vec![Script::Body(stream_body)]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![fragment(1, "hi", "A"), Reply::done()]
        );
        assert_eq!(relay.conversation().turns()[1].content, "A");
    }

    #[tokio::test]
    async fn missing_sentinel_still_completes_the_turn() {
        let (channel, sent) = ScriptedChannel::new(&[(1, "hi")]);
        let (transport, _, _) =
            MockTransport::new(vec![Script::Body(chunk_line("partial"))]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![fragment(1, "hi", "partial"), Reply::done()]
        );
        assert_eq!(relay.conversation().turns()[1].content, "partial");
    }

    #[tokio::test]
    async fn noise_and_empty_chunks_are_tolerated() {
        let (channel, sent) = ScriptedChannel::new(&[(1, "hi")]);
        let stream_body = concat!(
            ": keep-alive\n",
            "\n",
            "data: {}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"},\"finish_reason\":null}]}\n",
            "data: [DONE]\n",
        );
        let (transport, _, _) = MockTransport::new(vec![Script::Body(stream_body.to_string())]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![fragment(1, "hi", "ok"), Reply::done()]
        );
    }

    #[tokio::test]
    async fn stream_is_released_after_each_turn() {
        let (channel, _) = ScriptedChannel::new(&[(1, "one"), (2, "two")]);
        let (transport, _, drops) = MockTransport::new(vec![
            Script::Body(body(&["1"])),
            Script::Body(chunk_line("no sentinel")),
        ]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default());

        relay.run().await.unwrap();

        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn recent_window_bounds_the_context() {
        let (channel, _) = ScriptedChannel::new(&[(1, "one"), (2, "two")]);
        let (transport, seen_turns, _) = MockTransport::new(vec![
            Script::Body(body(&["1"])),
            Script::Body(body(&["2"])),
        ]);
        let mut relay = Relay::new(channel, transport, RelayConfig::default())
            .with_conversation(Conversation::with_policy(KeepRecent(2)));

        relay.run().await.unwrap();

        assert_eq!(*seen_turns.lock().unwrap(), vec![1, 2]);
        let turns = relay.conversation().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "two");
        assert_eq!(turns[1].content, "2");
    }
}
