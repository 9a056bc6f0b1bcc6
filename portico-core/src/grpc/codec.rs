//! # Dynamic message codec
//!
//! An implementation of `tonic::codec::Codec` that moves
//! [`DynamicMessage`] values instead of generated structs, so one client can
//! carry any unary call the descriptor catalog knows about.
//!
//! Only the decode side needs a schema: an outbound `DynamicMessage` already
//! carries its descriptor, while inbound bytes have to be interpreted against
//! one. On a client the decode descriptor is the response type; on a server
//! it is the request type.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tonic::Status;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};

/// A codec bridging `DynamicMessage` and the Protobuf binary format.
pub struct DynamicCodec {
    decode_desc: MessageDescriptor,
}

impl DynamicCodec {
    /// Creates a new `DynamicCodec`.
    ///
    /// # Arguments
    /// * `decode_desc` - Schema of inbound messages: the response type on a
    ///   client, the request type on a server.
    pub fn new(decode_desc: MessageDescriptor) -> Self {
        Self { decode_desc }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.decode_desc.clone())
    }
}

/// Encodes a `DynamicMessage` into Protobuf wire format.
pub struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode(dst)
            .map_err(|e| Status::internal(format!("failed to encode message: {e}")))
    }
}

/// Decodes Protobuf wire format into a `DynamicMessage` of the configured
/// type.
pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let msg = DynamicMessage::decode(self.0.clone(), src)
            .map_err(|e| Status::internal(format!("failed to decode message: {e}")))?;
        Ok(Some(msg))
    }
}
