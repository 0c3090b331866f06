//! Demo rows for a first install

use chrono::Utc;
use rusqlite::{Transaction, TransactionBehavior};
use serde_json::{json, Map, Value};

use super::{Database, RecordRepository, SqliteRecordRepository};
use crate::error::Result;
use crate::models::{Collection, Record};

/// Populate the local store with example rows.
///
/// Does nothing when `funcionarios` already holds data. Seeded rows are local
/// only: nothing is enqueued for the remote backend. Returns how many records
/// were written.
pub fn seed_initial_data(db: &Database) -> Result<usize> {
    let conn = db.connection()?;
    let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
    let repo = SqliteRecordRepository::new(&tx);

    if repo.count(Collection::Funcionarios)? > 0 {
        return Ok(0);
    }

    let mut written = 0;
    for (collection, records) in demo_records() {
        for record in records {
            repo.upsert(collection, record)?;
            written += 1;
        }
    }
    tx.commit()?;

    tracing::info!("Seeded local store with {written} example records");
    Ok(written)
}

fn record(value: Value) -> Record {
    let mut fields = match value {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let id = fields
        .remove("id")
        .and_then(|id| id.as_str().map(str::to_string))
        .unwrap_or_default();

    Record {
        id,
        updated_at: Utc::now(),
        fields,
    }
}

fn demo_records() -> Vec<(Collection, Vec<Record>)> {
    vec![
        (
            Collection::Funcionarios,
            vec![
                record(json!({
                    "id": "col-01",
                    "nome": "João Silva",
                    "dataAdmissao": "14/03/2019",
                    "cargo": "Supervisor de Campo",
                    "departamento": "Operações",
                    "examePeriodico": "18/09/2025",
                    "proximoExame": "18/09/2026",
                    "observacoes": "Treinamento NR-35 atualizado."
                })),
                record(json!({
                    "id": "col-02",
                    "nome": "Mariana Campos",
                    "dataAdmissao": "02/07/2021",
                    "cargo": "Analista de Logística",
                    "departamento": "Logística",
                    "examePeriodico": "09/08/2025",
                    "proximoExame": "09/08/2026",
                    "observacoes": "Revisar reciclagem de empilhadeira."
                })),
                record(json!({
                    "id": "col-03",
                    "nome": "Carlos Ribeiro",
                    "dataAdmissao": "27/11/2017",
                    "cargo": "Técnico de Manutenção",
                    "departamento": "Manutenção",
                    "examePeriodico": "22/10/2025",
                    "proximoExame": "22/10/2026",
                    "observacoes": "Apto para trabalho em altura."
                })),
            ],
        ),
        (
            Collection::Estoque,
            vec![
                record(json!({
                    "id": "EST-001",
                    "nome": "Capacete classe B",
                    "fornecedor": "ProtegeMax",
                    "quantidadeRecebida": 120,
                    "estoqueAtual": 178,
                    "custoUnitario": 48.5,
                    "valorNota": 5820
                })),
                record(json!({
                    "id": "EST-002",
                    "nome": "Respirador PFF2",
                    "fornecedor": "SafeEquip",
                    "quantidadeRecebida": 90,
                    "estoqueAtual": 124,
                    "custoUnitario": 12.9,
                    "valorNota": 1161
                })),
            ],
        ),
        (
            Collection::Fornecedores,
            vec![
                record(json!({
                    "id": "forn-01",
                    "nome": "ProtegeMax",
                    "responsavel": "Larissa Prado",
                    "telefone": "(11) 3888-9001",
                    "email": "larissa.prado@protegmax.com",
                    "observacoes": "Entrega mensal confirmada · Certificação ISO 45001."
                })),
                record(json!({
                    "id": "forn-02",
                    "nome": "Segurança Ativa",
                    "responsavel": "Eduardo Lemos",
                    "telefone": "(21) 2555-7744",
                    "email": "eduardo.lemos@segativa.com",
                    "observacoes": "Revisar contrato de manutenção preventiva."
                })),
            ],
        ),
        (
            Collection::Prazos,
            vec![
                record(json!({
                    "id": "PRZ-001",
                    "epi": "Respirador PFF2",
                    "fornecedor": "SafeEquip",
                    "ca": "37922",
                    "validade": "15/03/2026",
                    "fabricacao": "15/03/2024",
                    "tempoUsoMaximo": "12 meses",
                    "status": "No prazo"
                })),
                record(json!({
                    "id": "PRZ-002",
                    "epi": "Luva nitrílica",
                    "fornecedor": "Escudo Total",
                    "ca": "31114",
                    "validade": "28/01/2026",
                    "fabricacao": "28/01/2024",
                    "tempoUsoMaximo": "18 meses",
                    "status": "No prazo"
                })),
            ],
        ),
        (
            Collection::Lancamentos,
            vec![
                record(json!({
                    "id": "LAN-001",
                    "funcionario": "João Silva",
                    "cargo": "Supervisor de Campo",
                    "departamento": "Operações",
                    "equipamento": "Respirador PFF2",
                    "ca": "37922",
                    "entrega": "02/09/2025",
                    "trocaPrevista": "02/03/2026",
                    "vencimentoCa": "15/03/2026",
                    "status": "No prazo"
                })),
                record(json!({
                    "id": "LAN-002",
                    "funcionario": "Mariana Campos",
                    "cargo": "Analista de Logística",
                    "departamento": "Logística",
                    "equipamento": "Luva nitrílica",
                    "ca": "31114",
                    "entrega": "18/08/2025",
                    "trocaPrevista": "18/02/2026",
                    "vencimentoCa": "28/01/2026",
                    "status": "Próximo do vencimento"
                })),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqliteSyncQueueRepository, SyncQueueRepository};

    #[test]
    fn test_seed_populates_every_collection() {
        let db = Database::open_in_memory().unwrap();

        let written = seed_initial_data(&db).unwrap();
        assert_eq!(written, 11);

        let conn = db.connection().unwrap();
        let repo = SqliteRecordRepository::new(&conn);
        for collection in Collection::ALL {
            assert!(repo.count(collection).unwrap() >= 2, "{collection} is empty");
        }
    }

    #[test]
    fn test_seed_skips_when_data_exists() {
        let db = Database::open_in_memory().unwrap();

        seed_initial_data(&db).unwrap();
        assert_eq!(seed_initial_data(&db).unwrap(), 0);
    }

    #[test]
    fn test_seed_does_not_enqueue() {
        let db = Database::open_in_memory().unwrap();
        seed_initial_data(&db).unwrap();

        let conn = db.connection().unwrap();
        assert_eq!(
            SqliteSyncQueueRepository::new(&conn).pending_count().unwrap(),
            0
        );
    }
}
