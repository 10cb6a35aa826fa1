//! Engine configuration: alias table, status taxonomy, search paths and run limits.
//!
//! A configuration is loaded once (usually from JSON) and then shared read-only by every
//! component for the whole run. Every key is optional; missing keys take the defaults from
//! [`EngineConfig::default`].
//!
//! ```
//! use workbook_normalizer::config::EngineConfig;
//!
//! let cfg = EngineConfig::from_json_str(r#"{
//!     "search_paths": ["data", "."],
//!     "sources": [{ "name": "north", "file_name": "north.xlsx" }],
//!     "header_scan_depth": 5
//! }"#).unwrap();
//! assert_eq!(cfg.header_scan_depth, 5);
//! assert!(cfg.is_skipped_sheet("relatório geral"));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NormalizeError, NormalizeResult, Severity};
use crate::processing::text::{header_key, label_key, status_key};
use crate::types::{CanonicalField, CanonicalStatus};

/// Known raw-label variants per canonical field.
///
/// Comparison keys are computed once on construction; the set is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<CanonicalField, Vec<String>>",
    into = "BTreeMap<CanonicalField, Vec<String>>"
)]
pub struct AliasSet {
    aliases: BTreeMap<CanonicalField, Vec<String>>,
    label_keys: BTreeMap<CanonicalField, BTreeSet<String>>,
    header_keys: BTreeSet<String>,
}

impl AliasSet {
    pub fn new(aliases: BTreeMap<CanonicalField, Vec<String>>) -> Self {
        let label_keys = aliases
            .iter()
            .map(|(field, list)| {
                let keys = list
                    .iter()
                    .map(|a| label_key(a))
                    .filter(|k| !k.is_empty())
                    .collect();
                (*field, keys)
            })
            .collect();
        let header_keys = aliases
            .values()
            .flatten()
            .map(|a| header_key(a))
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            aliases,
            label_keys,
            header_keys,
        }
    }

    /// Configured aliases of `field`, in configured order.
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a column whose [`label_key`] is `key` belongs to `field`.
    pub fn matches(&self, field: CanonicalField, key: &str) -> bool {
        self.label_keys
            .get(&field)
            .is_some_and(|keys| keys.contains(key))
    }

    /// Union of every alias, folded with [`header_key`].
    pub fn header_keys(&self) -> &BTreeSet<String> {
        &self.header_keys
    }
}

impl From<BTreeMap<CanonicalField, Vec<String>>> for AliasSet {
    fn from(aliases: BTreeMap<CanonicalField, Vec<String>>) -> Self {
        Self::new(aliases)
    }
}

impl From<AliasSet> for BTreeMap<CanonicalField, Vec<String>> {
    fn from(set: AliasSet) -> Self {
        set.aliases
    }
}

impl Default for AliasSet {
    fn default() -> Self {
        let table: [(CanonicalField, &[&str]); 8] = [
            (CanonicalField::Date, &["DATA", "DT", "DATA_", "DATA CADASTRO", "DATA_INICIO"]),
            (
                CanonicalField::ResolutionDate,
                &[
                    "RESOLUÇÃO",
                    "RESOLUCAO",
                    "RESOL",
                    "DT_RESOLUCAO",
                    "DATA_CONCLUSAO",
                    "DT_CONCLUSAO",
                ],
            ),
            (CanonicalField::ContractId, &["CONTRATO", "NUM_CONTRATO", "NÚMERO CONTRATO"]),
            (CanonicalField::NegotiationDate, &["NEGOCIAÇÃO", "NEGOCIACAO", "DT_NEGOCIACAO"]),
            (CanonicalField::Status, &["SITUAÇÃO", "SITUACAO", "STATUS", "ESTADO"]),
            (CanonicalField::Priority, &["PRIORIDADE", "URGENCIA", "IMPORTANCIA"]),
            (CanonicalField::Responsible, &["RESPONSAVEL", "COLABORADOR", "NOME"]),
            (CanonicalField::Category, &["TIPO", "CATEGORIA", "CLASSIFICACAO"]),
        ];
        Self::new(
            table
                .into_iter()
                .map(|(field, list)| (field, list.iter().map(|s| s.to_string()).collect()))
                .collect(),
        )
    }
}

/// Mapping from raw status text to the canonical taxonomy.
///
/// Every canonical label maps to itself, so looking up an already-normalized value is a no-op.
/// When two configured variants fold to the same key, the first in sorted order wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, CanonicalStatus>",
    into = "BTreeMap<String, CanonicalStatus>"
)]
pub struct StatusTaxonomy {
    variants: BTreeMap<String, CanonicalStatus>,
    lookup: BTreeMap<String, CanonicalStatus>,
}

impl StatusTaxonomy {
    pub fn new(variants: BTreeMap<String, CanonicalStatus>) -> Self {
        let mut lookup = BTreeMap::new();
        for status in CanonicalStatus::ALL {
            lookup.insert(status_key(status.label()), status);
        }
        for (raw, status) in &variants {
            let key = status_key(raw);
            if !key.is_empty() {
                lookup.entry(key).or_insert(*status);
            }
        }
        Self { variants, lookup }
    }

    /// Look a raw value up. Case, surrounding whitespace and diacritics are ignored.
    pub fn lookup(&self, raw: &str) -> Option<CanonicalStatus> {
        self.lookup.get(&status_key(raw)).copied()
    }

    /// Configured raw variants (without the implicit identity entries).
    pub fn variants(&self) -> &BTreeMap<String, CanonicalStatus> {
        &self.variants
    }
}

impl From<BTreeMap<String, CanonicalStatus>> for StatusTaxonomy {
    fn from(variants: BTreeMap<String, CanonicalStatus>) -> Self {
        Self::new(variants)
    }
}

impl From<StatusTaxonomy> for BTreeMap<String, CanonicalStatus> {
    fn from(taxonomy: StatusTaxonomy) -> Self {
        taxonomy.variants
    }
}

impl Default for StatusTaxonomy {
    fn default() -> Self {
        use CanonicalStatus::*;
        let table = [
            ("VERIFICADO", Verificado),
            ("ANÁLISE", Analise),
            ("ANALISE", Analise),
            ("EM ANÁLISE", Analise),
            ("PENDENTE", Pendente),
            ("AGUARDANDO", Pendente),
            ("PRIORIDADE", Prioridade),
            ("PRIORIDADE TOTAL", PrioridadeTotal),
            ("APROVADO", Aprovado),
            ("QUITADO", Quitado),
            ("APREENDIDO", Apreendido),
            ("CANCELADO", Cancelado),
            ("CONCLUÍDO", Concluido),
            ("CONCLUIDA", Concluido),
            ("FINALIZADO", Concluido),
            ("EM ANDAMENTO", EmAndamento),
            ("ANDAMENTO", EmAndamento),
        ];
        Self::new(
            table
                .into_iter()
                .map(|(raw, status)| (raw.to_string(), status))
                .collect(),
        )
    }
}

/// A logical source and the file name expected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Logical name used to key the report (e.g. a team or group).
    pub name: String,
    /// File name looked up in each search directory.
    pub file_name: String,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: file_name.into(),
        }
    }
}

/// Immutable run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Raw-label variants per canonical field.
    pub aliases: AliasSet,
    /// Raw status text -> canonical status.
    pub status_taxonomy: StatusTaxonomy,
    /// Directories searched in priority order.
    pub search_paths: Vec<PathBuf>,
    /// Expected sources. Empty means: discover every workbook in the first usable directory.
    pub sources: Vec<SourceSpec>,
    /// Sheet names excluded before processing (case-insensitive, exact name).
    pub skip_sheets: Vec<String>,
    /// Number of leading rows scanned for the header.
    pub header_scan_depth: usize,
    /// Minimum number of distinct known labels a header row must contain.
    pub header_min_matches: usize,
    /// Status given to empty status cells. `None` leaves them absent.
    pub default_status: Option<CanonicalStatus>,
    /// Statuses counted as resolved.
    pub successful_statuses: Vec<CanonicalStatus>,
    /// Statuses counted as needing attention.
    pub attention_statuses: Vec<CanonicalStatus>,
    /// Worker pool size. `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Upper bound on concurrently executing workbook reads. `None` means one per worker.
    pub max_in_flight_reads: Option<usize>,
    /// How long the orchestrator waits for the pool, in seconds. `None` waits indefinitely.
    pub run_timeout_secs: Option<u64>,
    /// Attach the normalized records to each sheet entry of the report.
    pub keep_records: bool,
    /// Failures at or above this severity are also sent to observers as alerts.
    pub alert_severity: Severity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aliases: AliasSet::default(),
            status_taxonomy: StatusTaxonomy::default(),
            search_paths: vec![PathBuf::from("data"), PathBuf::from(".")],
            sources: Vec::new(),
            skip_sheets: [
                "TESTE",
                "TEST",
                "RESUMO",
                "SUMMARY",
                "RELATÓRIO GERAL",
                "GENERAL REPORT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            header_scan_depth: 10,
            header_min_matches: 2,
            default_status: Some(CanonicalStatus::Pendente),
            successful_statuses: vec![
                CanonicalStatus::Verificado,
                CanonicalStatus::Aprovado,
                CanonicalStatus::Quitado,
                CanonicalStatus::Concluido,
            ],
            attention_statuses: vec![
                CanonicalStatus::Prioridade,
                CanonicalStatus::PrioridadeTotal,
                CanonicalStatus::Analise,
            ],
            workers: None,
            max_in_flight_reads: None,
            run_timeout_secs: None,
            keep_records: false,
            alert_severity: Severity::Critical,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> NormalizeResult<Self> {
        let cfg: EngineConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_path(path: impl AsRef<Path>) -> NormalizeResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> NormalizeResult<()> {
        let invalid = |message: &str| {
            Err(NormalizeError::InvalidConfig {
                message: message.to_string(),
            })
        };
        if self.header_scan_depth == 0 {
            return invalid("header_scan_depth must be > 0");
        }
        if self.header_min_matches == 0 {
            return invalid("header_min_matches must be > 0");
        }
        if self.workers == Some(0) {
            return invalid("workers must be > 0 when set");
        }
        if self.max_in_flight_reads == Some(0) {
            return invalid("max_in_flight_reads must be > 0 when set");
        }
        if self.sources.iter().any(|s| s.name.trim().is_empty()) {
            return invalid("source names must not be empty");
        }
        Ok(())
    }

    /// Whether `sheet` is on the skip list (case-insensitive, exact name).
    pub fn is_skipped_sheet(&self, sheet: &str) -> bool {
        let upper = sheet.to_uppercase();
        self.skip_sheets.iter().any(|s| s.to_uppercase() == upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn skip_list_matches_any_case_but_exact_name() {
        let cfg = EngineConfig::default();
        assert!(cfg.is_skipped_sheet("TESTE"));
        assert!(cfg.is_skipped_sheet("teste"));
        assert!(cfg.is_skipped_sheet("Relatório Geral"));
        assert!(cfg.is_skipped_sheet("RELATÓRIO GERAL"));
        assert!(!cfg.is_skipped_sheet("TESTE 2"));
        assert!(!cfg.is_skipped_sheet("Maria"));
    }

    #[test]
    fn taxonomy_folds_accents_and_case() {
        let tax = StatusTaxonomy::default();
        assert_eq!(tax.lookup("Concluído"), Some(CanonicalStatus::Concluido));
        assert_eq!(tax.lookup("CONCLUIDA"), Some(CanonicalStatus::Concluido));
        assert_eq!(tax.lookup("finalizado"), Some(CanonicalStatus::Concluido));
        assert_eq!(tax.lookup(" análise "), Some(CanonicalStatus::Analise));
        assert_eq!(tax.lookup("xyz"), None);
    }

    #[test]
    fn taxonomy_maps_every_canonical_label_to_itself() {
        let tax = StatusTaxonomy::new(BTreeMap::new());
        for status in CanonicalStatus::ALL {
            assert_eq!(tax.lookup(status.label()), Some(status));
        }
    }

    #[test]
    fn alias_set_matches_folded_labels() {
        let aliases = AliasSet::default();
        assert!(aliases.matches(CanonicalField::Status, &label_key("Situação")));
        assert!(aliases.matches(CanonicalField::ContractId, &label_key("numero contrato")));
        assert!(!aliases.matches(CanonicalField::Status, &label_key("DATA")));
        assert!(aliases.header_keys().contains("SITUACAO"));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json_str(r#"{ "workers": 3 }"#).unwrap();
        assert_eq!(cfg.workers, Some(3));
        assert_eq!(cfg.header_scan_depth, 10);
        assert_eq!(cfg.default_status, Some(CanonicalStatus::Pendente));
    }

    #[test]
    fn json_alias_table_replaces_defaults() {
        let cfg = EngineConfig::from_json_str(
            r#"{ "aliases": { "STATUS": ["ETAPA"], "DATE": ["QUANDO"] },
                 "status_taxonomy": { "OK": "APROVADO" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.aliases.aliases(CanonicalField::Status), ["ETAPA".to_string()]);
        assert!(cfg.aliases.aliases(CanonicalField::Priority).is_empty());
        assert_eq!(cfg.status_taxonomy.lookup("ok"), Some(CanonicalStatus::Aprovado));
    }

    #[test]
    fn rejects_zero_limits() {
        let err = EngineConfig::from_json_str(r#"{ "header_scan_depth": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("header_scan_depth"));
        let err = EngineConfig::from_json_str(r#"{ "workers": 0 }"#).unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidConfig { .. }));
    }

    #[test]
    fn example_config_parses() {
        let cfg =
            EngineConfig::from_json_str(include_str!("../config/engine.example.json")).unwrap();
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.sources[0].file_name, "(JULIO) LISTAS INDIVIDUAIS.xlsx");
        assert_eq!(cfg.run_timeout_secs, Some(300));
        assert_eq!(cfg.alert_severity, Severity::Critical);
        assert_eq!(cfg.aliases, AliasSet::default());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, NormalizeError::ConfigParse(_)));
    }
}
