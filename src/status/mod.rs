//! Status source boundary: what the tracker needs from the passport status
//! service, plus the two status phrases it treats specially.

use anyhow::Result;
use async_trait::async_trait;

mod midpass;

pub use midpass::MidpassClient;

/// Status text the source returns for an application number it has no record
/// of. Compared verbatim on the intake path.
pub const NOT_FOUND_STATUS: &str = "Заявление с таким номером не было сохранено на сайте.";

/// Terminal status text: the document is ready and tracking stops.
pub const READY_STATUS: &str = "Статус заявления: паспорт готов.";

pub fn is_ready_status(status: &str) -> bool {
    status == READY_STATUS
}

/// External status lookup. All methods are idempotent reads; `Err` always
/// means a transient failure worth retrying.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Current status of a short-validity application.
    async fn lookup_status(&self, application_number: &str) -> Result<String>;

    /// Current status of a long-validity application, which the source keys
    /// by submission city as well as number.
    async fn lookup_status_in_city(
        &self,
        application_number: &str,
        city_id: u32,
    ) -> Result<String>;

    /// Resolve a city name to its identifier. `None` means the name is not
    /// known to the source (user error, not a failure).
    async fn lookup_city_id(&self, city_name: &str) -> Result<Option<u32>>;
}
