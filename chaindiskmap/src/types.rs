use std::borrow::Cow;
use std::error::Error;
use std::marker::PhantomData;

pub type BoxedError = Box<dyn Error + Sync + Send>;

/// Trait for encoding types into byte representation
pub trait BytesEncode<'a> {
    type EItem: 'a + ?Sized;

    /// Encode an item into bytes
    fn bytes_encode(item: &'a Self::EItem) -> Result<Cow<'a, [u8]>, BoxedError>;
}

/// Trait for decoding types from byte representation.
///
/// Values are copied out of the map before decoding, so decoded items own
/// their data.
pub trait BytesDecode {
    type DItem;

    /// Decode bytes into an item
    fn bytes_decode(bytes: &[u8]) -> Result<Self::DItem, BoxedError>;
}

/// Plain old data stored as its in-memory bytes (numbers, arrays of numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Native<T>(PhantomData<T>);

/// UTF-8 strings, decoded to `String`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Str;

/// Raw bytes, decoded to `Vec<u8>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bytes;

impl<'a, T> BytesEncode<'a> for Native<T>
where
    T: bytemuck::Pod,
{
    type EItem = T;

    fn bytes_encode(item: &'a T) -> Result<Cow<'a, [u8]>, BoxedError> {
        Ok(Cow::Borrowed(bytemuck::bytes_of(item)))
    }
}

impl<T> BytesDecode for Native<T>
where
    T: bytemuck::Pod,
{
    type DItem = T;

    fn bytes_decode(bytes: &[u8]) -> Result<T, BoxedError> {
        if bytes.len() != std::mem::size_of::<T>() {
            return Err(format!(
                "Invalid byte length for {}: expected {}, got {}",
                std::any::type_name::<T>(),
                std::mem::size_of::<T>(),
                bytes.len()
            )
            .into());
        }
        // record payloads carry no alignment guarantee
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

impl<'a> BytesEncode<'a> for Str {
    type EItem = str;

    fn bytes_encode(item: &'a str) -> Result<Cow<'a, [u8]>, BoxedError> {
        Ok(Cow::Borrowed(item.as_bytes()))
    }
}

impl BytesDecode for Str {
    type DItem = String;

    fn bytes_decode(bytes: &[u8]) -> Result<String, BoxedError> {
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| e.into())
    }
}

impl<'a> BytesEncode<'a> for Bytes {
    type EItem = [u8];

    fn bytes_encode(item: &'a [u8]) -> Result<Cow<'a, [u8]>, BoxedError> {
        Ok(Cow::Borrowed(item))
    }
}

impl BytesDecode for Bytes {
    type DItem = Vec<u8>;

    fn bytes_decode(bytes: &[u8]) -> Result<Vec<u8>, BoxedError> {
        Ok(bytes.to_vec())
    }
}
