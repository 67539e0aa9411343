//! The message catalog mechanism (spec.md §4.2): one declaration per server
//! mechanically yields a type-code enum with a `MAX_NUM_*` sentinel, a
//! request/confirmation/(indication) struct per kind, a tagged union per
//! direction, and a parallel names array for logging.
//!
//! Grounded on the `X_MSG_DEF`/`MAKE_X_MSG_STRUCT_*`/`MAKE_X_UNION_MEMBER_*`
//! macro families in `original_source/*/api/*_msg_macros.h`. Each of those
//! headers differs in exactly one respect — whether requests carry a
//! mandatory header, whether confirmations carry a mandatory `success`
//! field, and whether the server emits indications at all — so this module
//! provides one [`declare_catalog!`] macro with five arms, one per shape
//! actually used by a RoboOne server (see DESIGN.md for which catalog uses
//! which arm). Every declared body struct names its own fields; an entry
//! that needs none still gets a single-byte `_filler` field so the struct
//! stays non-zero-sized, per spec.md §4.2. Every struct's name is given
//! explicitly at the call site (rather than derived by token-pasting) to
//! keep the macro a small, ordinary `macro_rules!` — every artifact it
//! emits is still driven from the one entry list passed to it, so the list
//! is still written exactly once.

pub use crate::fabric::wire::{Encode, Reader};

/// Reader-based decode: every generated catalog struct implements this by
/// decoding its fields in declaration order. Primitive wire types below
/// implement it directly.
pub trait DecodeR: Sized {
    fn decode_r(r: &mut Reader) -> anyhow::Result<Self>;
}

macro_rules! impl_decode_r_primitive {
    ($ty:ty, $method:ident) => {
        impl DecodeR for $ty {
            fn decode_r(r: &mut Reader) -> anyhow::Result<Self> {
                r.$method()
            }
        }
    };
}

impl_decode_r_primitive!(u8, u8);
impl_decode_r_primitive!(u16, u16);
impl_decode_r_primitive!(u32, u32);
impl_decode_r_primitive!(i16, i16);
impl_decode_r_primitive!(i32, i32);
impl_decode_r_primitive!(bool, bool);

impl<const N: usize> DecodeR for [u8; N] {
    fn decode_r(r: &mut Reader) -> anyhow::Result<Self> {
        let bytes = r.take(N)?;
        let mut arr = [0u8; N];
        arr.copy_from_slice(&bytes);
        Ok(arr)
    }
}

/// A fixed-width nul-terminated string field, e.g. the Hindbrain command
/// string (`MAX_LEN_HINDBRAIN_DIRECT_COMMAND_STRING`, 30 bytes incl.
/// terminator). Longer strings are truncated and re-terminated on encode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixedStr<const W: usize>(pub String);

impl<const W: usize> FixedStr<W> {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl<const W: usize> Encode for FixedStr<W> {
    fn encode(&self, out: &mut Vec<u8>) {
        crate::fabric::wire::put_fixed_str(out, &self.0, W);
    }
}
impl<const W: usize> DecodeR for FixedStr<W> {
    fn decode_r(r: &mut Reader) -> anyhow::Result<Self> {
        Ok(Self(r.fixed_str(W)?))
    }
}

/// A nested `ShortMsg` payload, e.g. a timer's expiry message.
impl Encode for crate::fabric::wire::ShortFrame {
    fn encode(&self, out: &mut Vec<u8>) {
        self.encode_nested(out);
    }
}
impl DecodeR for crate::fabric::wire::ShortFrame {
    fn decode_r(r: &mut Reader) -> anyhow::Result<Self> {
        let len = r.u8()? as usize;
        anyhow::ensure!(len >= 1, "nested short message has zero length");
        let msg_type = r.u8()?;
        let body = r.take(len - 1)?;
        Ok(Self { msg_type, body })
    }
}

/// Declares one server's message catalog. See the module docs for the five
/// supported shapes; pick the arm matching the server being declared. Each
/// entry is written as `Variant = code, StructReq, StructCnf[, StructInd] {
/// req { fields }, cnf { fields } [, ind { fields }] }` — the struct names
/// are written out so the macro never needs identifier concatenation.
#[macro_export]
macro_rules! declare_catalog {
    // State Machine shape: both requests and confirmations carry the
    // mandatory header (`MAKE_STATE_MACHINE_MSG_STRUCT_REQ`/`_CNF` both
    // prepend `StateMachineMsgHeader`), no indications.
    (
        catalog = $Catalog:ident, header = $Header:ty, header_cnf, no_ind;
        $( $Entry:ident = $code:literal, $ReqName:ident, $CnfName:ident {
            req { $($rf:ident : $rty:ty),* $(,)? },
            cnf { $($cf:ident : $cty:ty),* $(,)? }
        } );* $(;)?
    ) => {
        $crate::__catalog_type_enum!($Catalog; $($Entry = $code),*);
        $( $crate::__catalog_req_with_header!($ReqName, $Header; $($rf : $rty),*); )*
        $( $crate::__catalog_req_with_header!($CnfName, $Header; $($cf : $cty),*); )*
        $crate::__catalog_union!(Req $Catalog; $($Entry : $ReqName),*);
        $crate::__catalog_union!(Cnf $Catalog; $($Entry : $CnfName),*);
    };

    // Hardware shape: no header, success-prefixed confirmations, no
    // indications.
    (
        catalog = $Catalog:ident, no_header, success_cnf, no_ind;
        $( $Entry:ident = $code:literal, $ReqName:ident, $CnfName:ident {
            req { $($rf:ident : $rty:ty),* $(,)? },
            cnf { $($cf:ident : $cty:ty),* $(,)? }
        } );* $(;)?
    ) => {
        $crate::__catalog_type_enum!($Catalog; $($Entry = $code),*);
        $( $crate::__catalog_plain_struct!($ReqName; $($rf : $rty),*); )*
        $( $crate::__catalog_success_struct!($CnfName; $($cf : $cty),*); )*
        $crate::__catalog_union!(Req $Catalog; $($Entry : $ReqName),*);
        $crate::__catalog_union!(Cnf $Catalog; $($Entry : $CnfName),*);
    };

    // One-Wire shape: mandatory request header (port number + serial
    // number), success-prefixed confirmations, no indications.
    (
        catalog = $Catalog:ident, header = $Header:ty, success_cnf, no_ind;
        $( $Entry:ident = $code:literal, $ReqName:ident, $CnfName:ident {
            req { $($rf:ident : $rty:ty),* $(,)? },
            cnf { $($cf:ident : $cty:ty),* $(,)? }
        } );* $(;)?
    ) => {
        $crate::__catalog_type_enum!($Catalog; $($Entry = $code),*);
        $( $crate::__catalog_req_with_header!($ReqName, $Header; $($rf : $rty),*); )*
        $( $crate::__catalog_success_struct!($CnfName; $($cf : $cty),*); )*
        $crate::__catalog_union!(Req $Catalog; $($Entry : $ReqName),*);
        $crate::__catalog_union!(Cnf $Catalog; $($Entry : $CnfName),*);
    };

    // Task Handler shape: no header, confirmations are always exactly
    // `{ success: bool }` regardless of per-entry content (the original's
    // "the Cnf message structure has fixed contents"), plus indications.
    (
        catalog = $Catalog:ident, no_header, fixed_success_cnf, with_ind;
        $( $Entry:ident = $code:literal, $ReqName:ident, $CnfName:ident, $IndName:ident {
            req { $($rf:ident : $rty:ty),* $(,)? },
            ind { $($indf:ident : $indty:ty),* $(,)? }
        } );* $(;)?
    ) => {
        $crate::__catalog_type_enum!($Catalog; $($Entry = $code),*);
        $( $crate::__catalog_plain_struct!($ReqName; $($rf : $rty),*); )*
        $( $crate::__catalog_fixed_success_struct!($CnfName); )*
        $( $crate::__catalog_plain_struct!($IndName; $($indf : $indty),*); )*
        $crate::__catalog_union!(Req $Catalog; $($Entry : $ReqName),*);
        $crate::__catalog_union!(Cnf $Catalog; $($Entry : $CnfName),*);
        $crate::__catalog_union!(Ind $Catalog; $($Entry : $IndName),*);
    };

    // Battery Manager shape: no header, plain confirmations (entries spell
    // out their own `success` field when they need one), plus indications
    // for the battery-data broadcasts.
    (
        catalog = $Catalog:ident, no_header, plain_cnf, with_ind;
        $( $Entry:ident = $code:literal, $ReqName:ident, $CnfName:ident, $IndName:ident {
            req { $($rf:ident : $rty:ty),* $(,)? },
            cnf { $($cf:ident : $cty:ty),* $(,)? },
            ind { $($indf:ident : $indty:ty),* $(,)? }
        } );* $(;)?
    ) => {
        $crate::__catalog_type_enum!($Catalog; $($Entry = $code),*);
        $( $crate::__catalog_plain_struct!($ReqName; $($rf : $rty),*); )*
        $( $crate::__catalog_plain_struct!($CnfName; $($cf : $cty),*); )*
        $( $crate::__catalog_plain_struct!($IndName; $($indf : $indty),*); )*
        $crate::__catalog_union!(Req $Catalog; $($Entry : $ReqName),*);
        $crate::__catalog_union!(Cnf $Catalog; $($Entry : $CnfName),*);
        $crate::__catalog_union!(Ind $Catalog; $($Entry : $IndName),*);
    };

    // Timer shape: no header, no confirmations, no indications — every
    // entry is a bare request (`original_source/timer/api/timer_msgs.h`
    // notes "these messages never have a confirm").
    (
        catalog = $Catalog:ident, no_header, no_cnf, no_ind;
        $( $Entry:ident = $code:literal, $ReqName:ident {
            req { $($rf:ident : $rty:ty),* $(,)? }
        } );* $(;)?
    ) => {
        $crate::__catalog_type_enum!($Catalog; $($Entry = $code),*);
        $( $crate::__catalog_plain_struct!($ReqName; $($rf : $rty),*); )*
        $crate::__catalog_union!(Req $Catalog; $($Entry : $ReqName),*);
    };
}

/// Emits the `{Catalog}MsgType` enum, its `MAX_NUM` sentinel, and its
/// `NAMES` parallel array. Entry codes must be contiguous starting at 0 —
/// true of every catalog in `original_source/*/api/*_msgs.h` — so `NAMES`
/// can be indexed directly by the discriminant.
#[doc(hidden)]
#[macro_export]
macro_rules! __catalog_type_enum {
    ($Catalog:ident; $($Entry:ident = $code:literal),* $(,)?) => {
        ::paste::paste! {
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            #[repr(u8)]
            pub enum [<$Catalog MsgType>] {
                $($Entry = $code,)*
            }

            impl [<$Catalog MsgType>] {
                /// One past the highest entry code — the original's `MAX_NUM_*` sentinel.
                pub const MAX_NUM: u8 = 0u8 $(+ { stringify!($Entry); 1u8 })*;

                pub const NAMES: &'static [&'static str] = &[$(stringify!($Entry)),*];

                pub fn name(self) -> &'static str {
                    Self::NAMES[self as usize]
                }

                pub fn from_code(code: u8) -> ::anyhow::Result<Self> {
                    match code {
                        $($code => Ok(Self::$Entry),)*
                        other => ::anyhow::bail!(
                            "unknown {} message type code {other}",
                            stringify!($Catalog)
                        ),
                    }
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __catalog_req_with_header {
    ($Name:ident, $Header:ty; $($f:ident : $ty:ty),*) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $Name {
            pub header: $Header,
            $(pub $f: $ty,)*
        }
        impl $crate::catalog::Encode for $Name {
            fn encode(&self, out: &mut Vec<u8>) {
                $crate::catalog::Encode::encode(&self.header, out);
                $($crate::catalog::Encode::encode(&self.$f, out);)*
            }
        }
        impl $crate::catalog::DecodeR for $Name {
            fn decode_r(r: &mut $crate::catalog::Reader) -> ::anyhow::Result<Self> {
                Ok(Self {
                    header: $crate::catalog::DecodeR::decode_r(r)?,
                    $($f: $crate::catalog::DecodeR::decode_r(r)?,)*
                })
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __catalog_plain_struct {
    ($Name:ident; ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $Name {
            pub _filler: u8,
        }
        impl $crate::catalog::Encode for $Name {
            fn encode(&self, out: &mut Vec<u8>) {
                out.push(0);
            }
        }
        impl $crate::catalog::DecodeR for $Name {
            fn decode_r(r: &mut $crate::catalog::Reader) -> ::anyhow::Result<Self> {
                let _ = r.u8()?;
                Ok(Self { _filler: 0 })
            }
        }
    };
    ($Name:ident; $($f:ident : $ty:ty),+) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $Name {
            $(pub $f: $ty,)+
        }
        impl $crate::catalog::Encode for $Name {
            fn encode(&self, out: &mut Vec<u8>) {
                $($crate::catalog::Encode::encode(&self.$f, out);)+
            }
        }
        impl $crate::catalog::DecodeR for $Name {
            fn decode_r(r: &mut $crate::catalog::Reader) -> ::anyhow::Result<Self> {
                Ok(Self {
                    $($f: $crate::catalog::DecodeR::decode_r(r)?,)+
                })
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __catalog_success_struct {
    ($Name:ident; $($f:ident : $ty:ty),*) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $Name {
            pub success: bool,
            $(pub $f: $ty,)*
        }
        impl $crate::catalog::Encode for $Name {
            fn encode(&self, out: &mut Vec<u8>) {
                $crate::catalog::Encode::encode(&self.success, out);
                $($crate::catalog::Encode::encode(&self.$f, out);)*
            }
        }
        impl $crate::catalog::DecodeR for $Name {
            fn decode_r(r: &mut $crate::catalog::Reader) -> ::anyhow::Result<Self> {
                Ok(Self {
                    success: $crate::catalog::DecodeR::decode_r(r)?,
                    $($f: $crate::catalog::DecodeR::decode_r(r)?,)*
                })
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __catalog_fixed_success_struct {
    ($Name:ident) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $Name {
            pub success: bool,
        }
        impl $crate::catalog::Encode for $Name {
            fn encode(&self, out: &mut Vec<u8>) {
                $crate::catalog::Encode::encode(&self.success, out);
            }
        }
        impl $crate::catalog::DecodeR for $Name {
            fn decode_r(r: &mut $crate::catalog::Reader) -> ::anyhow::Result<Self> {
                Ok(Self { success: $crate::catalog::DecodeR::decode_r(r)? })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::declare_catalog! {
        catalog = Probe, no_header, success_cnf, no_ind;
        ProbePing = 0, ProbePingReq, ProbePingCnf {
            req { value: u32 },
            cnf {}
        };
        ProbeEcho = 1, ProbeEchoReq, ProbeEchoCnf {
            req { text: FixedStr<8> },
            cnf { text: FixedStr<8> }
        };
    }

    #[test]
    fn req_round_trips_through_frame_encode_decode() {
        let req = ProbeReqMsg::ProbePing(ProbePingReq { value: 42 });
        let frame = req.to_frame();
        let msg_type = ProbeMsgType::from_code(frame.msg_type).unwrap();
        let decoded = ProbeReqMsg::decode_body(msg_type, &frame.body).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn fixed_str_field_round_trips_through_frame_encode_decode() {
        let cnf = ProbeCnfMsg::ProbeEcho(ProbeEchoCnf { text: FixedStr::new("hi") });
        let frame = cnf.to_frame();
        let msg_type = ProbeMsgType::from_code(frame.msg_type).unwrap();
        let decoded = ProbeCnfMsg::decode_body(msg_type, &frame.body).unwrap();
        assert_eq!(decoded, cnf);
    }

    #[test]
    fn names_table_has_one_entry_per_code_up_to_max_num() {
        assert_eq!(ProbeMsgType::NAMES.len(), ProbeMsgType::MAX_NUM as usize);
        assert_eq!(ProbeMsgType::NAMES, &["ProbePing", "ProbeEcho"]);
        for code in 0..ProbeMsgType::MAX_NUM {
            assert!(ProbeMsgType::from_code(code).is_ok());
        }
        assert!(ProbeMsgType::from_code(ProbeMsgType::MAX_NUM).is_err());
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(ProbeMsgType::from_code(255).is_err());
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __catalog_union {
    ($Direction:ident $Catalog:ident; $($Entry:ident : $Struct:ident),* $(,)?) => {
        ::paste::paste! {
            /// A decoded, type-tagged message body for this catalog and direction —
            /// the Rust replacement for the original's `union` of per-entry structs.
            #[derive(Debug, Clone, PartialEq)]
            pub enum [<$Catalog $Direction Msg>] {
                $($Entry($Struct),)*
            }

            impl [<$Catalog $Direction Msg>] {
                pub fn msg_type(&self) -> [<$Catalog MsgType>] {
                    match self {
                        $(Self::$Entry(_) => [<$Catalog MsgType>]::$Entry,)*
                    }
                }

                pub fn encode_body(&self) -> Vec<u8> {
                    let mut out = Vec::new();
                    match self {
                        $(Self::$Entry(msg) => $crate::catalog::Encode::encode(msg, &mut out),)*
                    }
                    out
                }

                /// Decodes a body given its already-extracted type code.
                pub fn decode_body(msg_type: [<$Catalog MsgType>], body: &[u8]) -> ::anyhow::Result<Self> {
                    let mut r = $crate::catalog::Reader::new(body);
                    match msg_type {
                        $([<$Catalog MsgType>]::$Entry => {
                            Ok(Self::$Entry($crate::catalog::DecodeR::decode_r(&mut r)?))
                        })*
                    }
                }

                pub fn to_frame(&self) -> $crate::fabric::wire::Frame {
                    $crate::fabric::wire::Frame {
                        msg_type: self.msg_type() as u8,
                        body: self.encode_body(),
                    }
                }
            }
        }
    };
}
