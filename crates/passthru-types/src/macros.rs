/// Declares a J2534 constant enum with its numeric value and log/serde name.
macro_rules! j2534_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Numeric value as passed to the driver
            pub fn value(self) -> u32 {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Name as printed in shim logs
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn from_value(value: u32) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.value() == value)
            }

            pub fn from_name(name: &str) -> Option<Self> {
                let name = name.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(name))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::error::TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $crate::codec::parse_log_token(s, Self::from_name, Self::from_value).ok_or_else(
                    || $crate::error::TypeError::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    },
                )
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                #[derive(::serde::Deserialize)]
                #[serde(untagged)]
                enum Repr {
                    Name(String),
                    Value(u32),
                }

                let parsed = match Repr::deserialize(deserializer)? {
                    Repr::Name(name) => name.parse::<$name>().ok(),
                    Repr::Value(value) => $name::from_value(value),
                };
                parsed.ok_or_else(|| {
                    <D::Error as ::serde::de::Error>::custom(concat!("invalid ", $kind))
                })
            }
        }
    };
}
