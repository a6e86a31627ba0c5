//! Default CSV fields and the required-field report

use opsdk_core::display_name;

use crate::types::{
    CAPABILITIES_ANNOTATION, CSV_API_VERSION, CSV_KIND, ClusterServiceVersion, InstallMode, InstallModeType, csv_name,
};

const DEFAULT_NAMESPACE: &str = "placeholder";
const DEFAULT_CAPABILITIES: &str = "Basic Install";
const DEFAULT_DESCRIPTION: &str = "Placeholder description";
const DEFAULT_MATURITY: &str = "alpha";

/// Set the fields with fixed values and fill empty user fields with
/// placeholders
pub fn set_csv_default_fields(csv: &mut ClusterServiceVersion, operator_name: &str, version: &str) {
    csv.api_version = CSV_API_VERSION.to_string();
    csv.kind = CSV_KIND.to_string();
    csv.metadata.name = Some(csv_name(&operator_name.to_lowercase(), version));

    if csv.metadata.namespace.as_deref().unwrap_or_default().is_empty() {
        csv.metadata.namespace = Some(DEFAULT_NAMESPACE.to_string());
    }
    let capabilities = csv.annotations_mut().entry(CAPABILITIES_ANNOTATION.to_string()).or_default();
    if capabilities.is_empty() {
        *capabilities = DEFAULT_CAPABILITIES.to_string();
    }

    let spec = &mut csv.spec;
    if spec.display_name.is_empty() {
        spec.display_name = display_name(operator_name);
    }
    if spec.description.is_empty() {
        spec.description = DEFAULT_DESCRIPTION.to_string();
    }
    if spec.maturity.is_empty() {
        spec.maturity = DEFAULT_MATURITY.to_string();
    }
    if spec.install_modes.is_empty() {
        spec.install_modes = vec![
            InstallMode::new(InstallModeType::OwnNamespace, true),
            InstallMode::new(InstallModeType::SingleNamespace, true),
            InstallMode::new(InstallModeType::MultiNamespace, false),
            InstallMode::new(InstallModeType::AllNamespaces, true),
        ];
    }
}

/// Required fields that are still empty
pub fn empty_required_fields(csv: &ClusterServiceVersion) -> Vec<&'static str> {
    let spec = &csv.spec;
    let checks = [
        (csv.api_version != CSV_API_VERSION, "apiVersion"),
        (csv.kind != CSV_KIND, "kind"),
        (csv.name().is_empty(), "metadata.name"),
        (spec.version.is_none(), "spec.version"),
        (spec.display_name.is_empty(), "spec.displayName"),
        (spec.description.is_empty(), "spec.description"),
        (spec.keywords.is_empty(), "spec.keywords"),
        (spec.maintainers.is_empty(), "spec.maintainers"),
        (spec.provider.is_empty(), "spec.provider"),
        (spec.maturity.is_empty(), "spec.maturity"),
    ];
    checks
        .into_iter()
        .filter_map(|(missing, field)| missing.then_some(field))
        .collect()
}

/// One field per line, each indented by a tab
pub fn join_fields(fields: &[&str]) -> String {
    fields.iter().map(|f| format!("\n\t{f}")).collect()
}
