//! Runtime wiring for llmgate: the `wreq` upstream client, the instrumented
//! transport handed to provider SDK calls, streaming hooks and bootstrap.

pub mod bootstrap;
pub mod stream_hooks;
pub mod transport;
pub mod upstream_client;

pub use bootstrap::{Bootstrap, CliArgs, InitializedClient, bootstrap, load_app_config};
pub use stream_hooks::{
    GraphEvent, NewTokenHook, ON_MESSAGE_DELTA, ON_REASONING_DELTA, ON_RUN_STEP, ResponseSink,
    SinkClosed, SseResponseSink, StreamEventHandler, create_handle_llm_new_token,
    create_stream_event_handlers, encode_message_frame, forward_stream_event,
};
pub use transport::{
    CHAT_COMPLETIONS_PATH, ChatSummary, InstrumentedFetch, create_fetch, summarize_chat_response,
};
pub use upstream_client::{UpstreamClientConfig, WreqUpstreamClient};
