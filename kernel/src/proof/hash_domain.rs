//! Typed domain separators for canonical hashing.
//!
//! Every hash computation selects a domain via [`HashDomain`]. Adding a
//! domain is a single change here: the enum, `as_bytes()`, `ALL`, and
//! `Display` are generated from the same macro invocation.

macro_rules! define_hash_domains {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $bytes:expr
        ),+ $(,)?
    ) => {
        /// Typed domain separator for [`super::hash::canonical_hash`].
        ///
        /// Every variant maps to a unique, null-terminated byte string used
        /// as a SHA-256 prefix.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HashDomain {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HashDomain {
            /// The raw domain-separator bytes (null-terminated).
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $( Self::$variant => $bytes, )+
                }
            }

            /// All domain variants in declaration order.
            pub const ALL: &[HashDomain] = &[
                $( Self::$variant, )+
            ];
        }

        impl core::fmt::Display for HashDomain {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $( Self::$variant => write!(f, stringify!($variant)), )+
                }
            }
        }
    };
}

define_hash_domains! {
    /// Search-state graph structure (states, flags, arcs).
    SearchGraph => b"TOKENPASS::SEARCH_GRAPH::V1\0",

    /// Decoder policy echo.
    DecoderPolicy => b"TOKENPASS::DECODER_POLICY::V1\0",

    /// Token graph export (result tokens, predecessors, alternates).
    TokenGraph => b"TOKENPASS::TOKEN_GRAPH::V1\0",

    /// Per-frame audit log.
    FrameLog => b"TOKENPASS::FRAME_LOG::V1\0",

    /// Full decode report written by the harness.
    DecodeReport => b"TOKENPASS::DECODE_REPORT::V1\0",
}
