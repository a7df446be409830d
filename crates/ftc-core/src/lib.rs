pub mod onbotjava;

pub use onbotjava::{
    build_launch, decode_pushed, encode_event, subscribe_to, OnBotJavaEvent, ProtocolError,
    PushedMessage, ONBOTJAVA_NAMESPACE, SYSTEM_NAMESPACE,
};
