//! Serde plumbing shared by [`Packet`](crate::Packet) and [`Mask`](crate::Mask).
//!
//! Both serialize as a plain sequence of exactly `N` lanes. serde only ships
//! array impls up to 32 elements, so const-generic widths go through here.

use serde::de::{Error as _, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

pub(crate) fn serialize_lanes<T, S>(lanes: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(lanes.len()))?;
    for lane in lanes {
        seq.serialize_element(lane)?;
    }
    seq.end()
}

pub(crate) fn deserialize_lanes<'de, T, D, const N: usize>(deserializer: D) -> Result<[T; N], D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    struct LaneVisitor<T, const N: usize>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>, const N: usize> Visitor<'de> for LaneVisitor<T, N> {
        type Value = [T; N];

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a sequence of exactly {N} lanes")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut lanes = Vec::with_capacity(N);
            while let Some(lane) = seq.next_element()? {
                if lanes.len() == N {
                    return Err(A::Error::invalid_length(N + 1, &self));
                }
                lanes.push(lane);
            }
            let got = lanes.len();
            lanes
                .try_into()
                .map_err(|_| A::Error::invalid_length(got, &self))
        }
    }

    deserializer.deserialize_seq(LaneVisitor::<T, N>(PhantomData))
}
