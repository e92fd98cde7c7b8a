//! The marker trait for application events that should reach analytics.

use evtrack_protocol::Hit;

/// An application event that is reported to analytics when broadcast.
///
/// Every method has a default, so the smallest implementation is an empty
/// `impl` block: the event is then reported with its type name as the
/// action.
///
/// ```rust
/// use evtrack_analytics::ShouldBroadcastToAnalytics;
/// use evtrack_protocol::Hit;
///
/// struct OrderWasPaid {
///     total_cents: u64,
/// }
///
/// impl ShouldBroadcastToAnalytics for OrderWasPaid {
///     fn event_category(&self) -> Option<String> {
///         Some("orders".into())
///     }
///
///     fn with_analytics(&self, hit: &mut Hit) {
///         hit.event_value = Some(self.total_cents);
///     }
/// }
///
/// let event = OrderWasPaid { total_cents: 1999 };
/// assert_eq!(event.event_action(), "OrderWasPaid");
/// ```
pub trait ShouldBroadcastToAnalytics: Send + Sync + 'static {
    /// The event action (`ea`). Defaults to the unqualified type name.
    fn event_action(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }

    /// The event category (`ec`). `None` falls back to the broadcaster's
    /// default category.
    fn event_category(&self) -> Option<String> {
        None
    }

    /// Last chance to adjust the hit (label, value, dimensions) before it
    /// is sent.
    fn with_analytics(&self, _hit: &mut Hit) {}
}

/// Strips the module path (and any generic arguments) from a type name:
/// `shop::events::OrderWasPaid<u8>` → `OrderWasPaid`.
fn short_type_name(full: &str) -> &str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UserRegistered;
    impl ShouldBroadcastToAnalytics for UserRegistered {}

    struct Wrapped<T>(T);
    impl<T: Send + Sync + 'static> ShouldBroadcastToAnalytics for Wrapped<T> {}

    struct Labelled;
    impl ShouldBroadcastToAnalytics for Labelled {
        fn event_action(&self) -> String {
            "custom-action".into()
        }

        fn with_analytics(&self, hit: &mut Hit) {
            hit.event_label = Some("label".into());
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::C"), "C");
        assert_eq!(short_type_name("C"), "C");
        assert_eq!(short_type_name("a::Wrapped<b::C>"), "Wrapped");
    }

    #[test]
    fn test_default_action_is_type_name() {
        assert_eq!(UserRegistered.event_action(), "UserRegistered");
        assert_eq!(Wrapped(1u8).event_action(), "Wrapped");
        assert_eq!(UserRegistered.event_category(), None);
    }

    #[test]
    fn test_overrides_apply() {
        let mut hit = Hit::default();
        Labelled.with_analytics(&mut hit);

        assert_eq!(Labelled.event_action(), "custom-action");
        assert_eq!(hit.event_label.as_deref(), Some("label"));
    }

    #[test]
    fn test_trait_object_uses_concrete_type_name() {
        let event: Box<dyn ShouldBroadcastToAnalytics> = Box::new(UserRegistered);
        assert_eq!(event.event_action(), "UserRegistered");
    }
}
