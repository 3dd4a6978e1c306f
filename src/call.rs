//! Declared metadata for a logged call.
//!
//! A [`CallSpec`] names the type and method being called, carries the static description and
//! records which parameters go into the log and which are left out. Values are converted to
//! JSON as they are declared; conversion failures are kept and reported by the
//! [`EventBuilder`](crate::EventBuilder) instead of surfacing at the call site.

use serde::Serialize;
use serde_json::Value;

/// A declared parameter of a logged call.
#[derive(Debug)]
pub(crate) struct Param {
    pub(crate) name: &'static str,
    pub(crate) value: ParamValue,
}

#[derive(Debug)]
pub(crate) enum ParamValue {
    Captured(Result<Value, serde_json::Error>),
    /// Marked for exclusion; the value was never looked at.
    Excluded,
}

/// Metadata for one logged call: who is called, why, and with what.
///
/// # Examples
///
/// ```rust
/// use call_logger::CallSpec;
///
/// struct OrderController;
///
/// let order_id = 42u64;
/// let card_number = "4111 1111 1111 1111";
///
/// let spec = CallSpec::for_type::<OrderController>("pay")
///     .desc("pay for an order")
///     .param("order_id", &order_id)
///     .exclude("card_number");
///
/// assert_eq!(spec.qualified_name(), "OrderController.pay");
/// assert_eq!(spec.description(), "pay for an order");
/// # let _ = card_number;
/// ```
#[derive(Debug)]
pub struct CallSpec {
    type_name: &'static str,
    method_name: &'static str,
    desc: &'static str,
    params: Vec<Param>,
}

impl CallSpec {
    pub fn new(type_name: &'static str, method_name: &'static str) -> Self {
        Self {
            type_name,
            method_name,
            desc: "",
            params: Vec::new(),
        }
    }

    /// Create a spec for a method declared on `T`, using the simple name of `T`.
    pub fn for_type<T: ?Sized>(method_name: &'static str) -> Self {
        Self::new(simple_type_name::<T>(), method_name)
    }

    /// Set the static description copied into `logDesc`.
    pub fn desc(mut self, desc: &'static str) -> Self {
        self.desc = desc;
        self
    }

    /// Declare a parameter to be logged under `name`.
    ///
    /// Declaring the same name twice keeps the later value.
    pub fn param<V: Serialize + ?Sized>(mut self, name: &'static str, value: &V) -> Self {
        self.params.push(Param {
            name,
            value: ParamValue::Captured(serde_json::to_value(value)),
        });
        self
    }

    /// Declare a parameter that must never appear in the log.
    pub fn exclude(mut self, name: &'static str) -> Self {
        self.params.push(Param {
            name,
            value: ParamValue::Excluded,
        });
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn method_name(&self) -> &'static str {
        self.method_name
    }

    pub fn description(&self) -> &'static str {
        self.desc
    }

    /// `<Type>.<method>`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.type_name, self.method_name)
    }

    /// Names of every declared parameter, excluded ones included, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().map(|p| p.name)
    }

    pub(crate) fn into_params(self) -> Vec<Param> {
        self.params
    }
}

/// The last path segment of `T`'s type name, without generic arguments.
///
/// `my_app::api::Repo<my_app::User>` becomes `Repo`.
pub fn simple_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Build a [`CallSpec`] with parameter names taken from the given identifiers.
///
/// Parameters listed after `; skip` are declared excluded and are not evaluated.
///
/// ```rust
/// use call_logger::call_spec;
///
/// struct AccountController;
///
/// let user = "alice";
/// let password = "hunter2";
/// let spec = call_spec!(AccountController::login, "sign in", user; skip password);
///
/// assert_eq!(spec.qualified_name(), "AccountController.login");
/// assert_eq!(spec.param_names().collect::<Vec<_>>(), vec!["user", "password"]);
/// # let _ = password;
/// ```
#[macro_export]
macro_rules! call_spec {
    ($ty:ident :: $method:ident, $desc:expr $(, $param:ident)* $(; skip $($skipped:ident),+)?) => {
        $crate::CallSpec::for_type::<$ty>(stringify!($method))
            .desc($desc)
            $(.param(stringify!($param), &$param))*
            $($(.exclude(stringify!($skipped)))+)?
    };
}
