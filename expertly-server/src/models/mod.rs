//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

/// Declare a string-backed enum stored in a TEXT column.
///
/// Generates `as_str`, `FromStr`, `Display`, serde and sqlx impls from one
/// variant/label table. JSON and the column use the same labels.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident { field = $field:literal; $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(#[serde(rename = $label)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err($crate::models::ValidationError::InvalidVariant {
                        field: $field,
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                Ok(s.parse::<$name>()?)
            }
        }
    };
}

pub mod validation;
pub mod pagination;
pub mod sort;
pub mod role;
pub mod phone;
pub mod category;
pub mod expert;
pub mod customer;
pub mod testimonial;

pub use validation::ValidationError;
pub use pagination::{PageInfo, Pagination, PaginationParams};
pub use sort::{CategorySortField, ExpertSortField, SortOrder};
pub use role::Role;
pub use phone::{OtpCode, PhoneNumber};
pub use category::{CategoryChanges, CategoryName, NewCategory, ParentFilter};
pub use expert::{
    AccountStatus, EmploymentType, Experience, ExpertChanges, ExpertFilter, ExpertProfileInput,
    Gender, Language, NewExpert, PaymentAccount, PaymentAccountType, SocialMediaLink,
    VerificationStatus,
};
pub use customer::{CustomerProfile, Interest};
pub use testimonial::NewTestimonial;
