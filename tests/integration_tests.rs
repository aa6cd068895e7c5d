use clap::Parser;
use onus_rateio::core::terms_csv::read_terms;
use onus_rateio::utils::validation::Validate;
use onus_rateio::{CliConfig, LocalStorage, OnusEngine, OnusPipeline, ReferenceData, TomlConfig};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const AREA_CSV: &str = "UF,AreaPrestacao,codMun,Municipio\n\
PR,Toda UF,4106902,Curitiba\n\
PR,Toda UF,4113700,Londrina\n\
PR,Norte,4113700,Londrina\n";

const POP_CSV: &str = "AnoBase,UF,codMun,popMun\n\
2020,PR,4106902,100000\n\
2020,PR,4113700,50000\n";

const TERMS_CSV: &str = "AnoBase,Entidade,NumTermo,AnoTermo,UF,AreaPrestacao,AreaExclusao,MunicipioExclusao,FrequenciaInicial,FrequenciaFinal,FrequenciaCentral,Banda,Tipo\n\
2020,VIVO,001,2012,PR,Toda UF,,,3400,3420,3410,20,ONUS\n\
2020,VIVO,002,2013,PR,Norte,Norte,,3300,3310,3305,10,ONUS\n\
2020,CLARO,010,2012,PR,Toda UF,Norte,,2500,2510,2505,10,DEMAIS\n";

fn seed(dir: &Path) {
    std::fs::write(dir.join("area.csv"), AREA_CSV).unwrap();
    std::fs::write(dir.join("pop.csv"), POP_CSV).unwrap();
    std::fs::write(dir.join("termos.csv"), TERMS_CSV).unwrap();
}

fn batch_config(compressed: bool) -> TomlConfig {
    let content = format!(
        r#"
[run]
name = "pr-2020"

[reference]
area_file = "area.csv"
population_file = "pop.csv"

[terms]
file = "termos.csv"

[output]
path = "out"
formats = ["csv", "json"]

[output.compression]
enabled = {compressed}
filename = "onus.zip"

[[calculation]]
base_year = 2020
entity = "VIVO"
state = "PR"
term_number = "001"
term_year = 2012
rol = 1000000.0

[[calculation]]
base_year = 2020
entity = "CLARO"
state = "PR"
term_number = "010"
term_year = 2012
rol = 500000.0

[[calculation]]
base_year = 2020
entity = "TIM"
state = "PR"
"#
    );
    TomlConfig::from_toml_str(&content).unwrap()
}

#[tokio::test]
async fn test_end_to_end_batch_writes_every_output() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    let config = batch_config(false);
    assert!(config.validate().is_ok());

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let reference = ReferenceData::load(&storage, "area.csv", "pop.csv").await.unwrap();
    let pipeline = OnusPipeline::new(storage, config, Arc::new(reference));
    let engine = OnusEngine::new_with_monitoring(pipeline, false);

    let output_path = engine.run().await.unwrap();
    assert_eq!(output_path, "out");

    let out = temp_dir.path().join("out");
    let vivo = std::fs::read_to_string(out.join("fatores_2020_VIVO_PR_001_2012.csv")).unwrap();
    let lines: Vec<&str> = vivo.lines().collect();
    assert_eq!(lines[0], "codMun,Municipio,fatorFreq,fatorPop,onusMunicipio");
    assert_eq!(lines[1], "4106902,Curitiba,1.0000,0.666667,13333.33");
    assert_eq!(lines[2], "4113700,Londrina,1.0000,0.333333,6666.67");

    // Claro's term excludes Norte, so it covers Curitiba alone.
    let claro = std::fs::read_to_string(out.join("fatores_2020_CLARO_PR_010_2012.csv")).unwrap();
    assert_eq!(claro.lines().count(), 2);
    assert!(claro.contains("4106902,Curitiba,1.0000,0.666667,6666.67"));

    let expanded = std::fs::read_to_string(out.join("termos_expandidos.csv")).unwrap();
    assert_eq!(expanded.lines().count(), 4);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("relatorio.json")).unwrap()).unwrap();
    assert_eq!(report["rejected_terms"][0]["term"], "002/2013");
    assert_eq!(report["outcomes"][0]["status"], "computed");
    assert_eq!(report["outcomes"][1]["status"], "computed");
    assert_eq!(report["outcomes"][2]["status"], "invalid");
    assert_eq!(report["outcomes"][2]["reason"], "Term not selected");
    assert!(report["generated_at"].is_string());
}

#[tokio::test]
async fn test_end_to_end_batch_bundles_zip() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let reference = ReferenceData::load(&storage, "area.csv", "pop.csv").await.unwrap();
    let pipeline = OnusPipeline::new(storage, batch_config(true), Arc::new(reference));

    let output_path = OnusEngine::new(pipeline).run().await.unwrap();
    assert_eq!(output_path, "out/onus.zip");

    let zip_path = temp_dir.path().join("out/onus.zip");
    let mut archive = zip::ZipArchive::new(std::fs::File::open(zip_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 4);

    let mut factors = String::new();
    archive
        .by_name("fatores_2020_VIVO_PR_001_2012.csv")
        .unwrap()
        .read_to_string(&mut factors)
        .unwrap();
    assert!(factors.contains("13333.33"));
    assert!(!temp_dir.path().join("out/relatorio.json").exists());
}

#[tokio::test]
async fn test_cli_config_runs_single_calculation() {
    let temp_dir = TempDir::new().unwrap();
    seed(temp_dir.path());

    let config = CliConfig::parse_from([
        "onus",
        "--area-file",
        "area.csv",
        "--population-file",
        "pop.csv",
        "--terms-file",
        "termos.csv",
        "--output-path",
        "cli-out",
        "--formats",
        "csv",
        "--base-year",
        "2020",
        "--entity",
        "VIVO",
        "--state",
        "PR",
        "--term-number",
        "001",
        "--term-year",
        "2012",
        "--rol",
        "250000",
    ]);
    assert!(config.validate().is_ok());

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let reference = ReferenceData::load(&storage, "area.csv", "pop.csv").await.unwrap();
    let pipeline = OnusPipeline::new(storage, config, Arc::new(reference));
    OnusEngine::new(pipeline).run().await.unwrap();

    let out = temp_dir.path().join("cli-out");
    let factors = std::fs::read_to_string(out.join("fatores_2020_VIVO_PR_001_2012.csv")).unwrap();
    assert!(factors.contains("4106902,Curitiba,1.0000,0.666667,3333.33"));
    assert!(!out.join("relatorio.json").exists());
}

#[tokio::test]
async fn test_missing_terms_file_fails_the_run() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("area.csv"), AREA_CSV).unwrap();
    std::fs::write(temp_dir.path().join("pop.csv"), POP_CSV).unwrap();

    let storage = LocalStorage::new(temp_dir.path().to_string_lossy().into_owned());
    let reference = ReferenceData::load(&storage, "area.csv", "pop.csv").await.unwrap();
    let pipeline = OnusPipeline::new(storage, batch_config(false), Arc::new(reference));

    let err = OnusEngine::new(pipeline).run().await.unwrap_err();
    assert!(matches!(err, onus_rateio::OnusError::IoError(_)));
}

#[test]
fn test_exported_terms_read_back() {
    let terms = read_terms(TERMS_CSV.as_bytes()).unwrap();
    assert_eq!(terms.len(), 3);
    assert_eq!(terms[2].exclusion_areas, vec!["Norte".to_string()]);
}
