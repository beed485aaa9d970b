//! Testimonial input

use super::validation::{in_range, required_text, url};
use super::ValidationError;

const MAX_MESSAGE_LEN: usize = 2000;

/// Validated testimonial
#[derive(Debug, Clone)]
pub struct NewTestimonial {
    pub rating: i32,
    pub user_name: String,
    pub user_image: String,
    pub message: String,
}

impl NewTestimonial {
    pub fn new(
        rating: i32,
        user_name: &str,
        user_image: &str,
        message: &str,
    ) -> Result<Self, ValidationError> {
        in_range("rating", rating as f64, 1.0, Some(5.0))?;
        let user_image = required_text("user_image", user_image, 2048)?;
        url("user_image", &user_image)?;
        Ok(Self {
            rating,
            user_name: required_text("user_name", user_name, 255)?,
            user_image,
            message: required_text("message", message, MAX_MESSAGE_LEN)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        let ok = NewTestimonial::new(5, "Ravi", "https://cdn.example.com/r.png", "Great help");
        assert!(ok.is_ok());
        assert!(NewTestimonial::new(0, "Ravi", "https://cdn.example.com/r.png", "x").is_err());
        assert!(NewTestimonial::new(6, "Ravi", "https://cdn.example.com/r.png", "x").is_err());
    }

    #[test]
    fn requires_text_fields() {
        assert!(NewTestimonial::new(4, " ", "https://cdn.example.com/r.png", "x").is_err());
        assert!(NewTestimonial::new(4, "Ravi", "", "x").is_err());
        assert!(NewTestimonial::new(4, "Ravi", "https://cdn.example.com/r.png", "").is_err());
    }
}
