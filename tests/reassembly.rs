//! Fragment staging survives restarts and completes in any arrival order

use nntp_archiver::{
    ArchiveError, ArtifactKind, FsStaging, MailDecoder, MailParserDecoder, MemoryStaging,
    ParsedMail, Reassembler, Reassembly, StagingKey, StagingStore,
};

fn fragment(message_id: &str, number: u32, total: u32, xref: &str, body: &str) -> Vec<u8> {
    format!(
        "Message-ID: {}\r\nSubject: part {}\r\nXref: {}\r\n\
         Content-Type: message/partial; id=\"big@poster\"; number={}; total={}\r\n\r\n{}",
        message_id, number, xref, number, total, body
    )
    .into_bytes()
}

fn parts() -> Vec<Vec<u8>> {
    vec![
        fragment(
            "<f1@poster>",
            1,
            3,
            "news.test alt.test:10",
            "Subject: the whole story\r\nFrom: Poster <poster@example.com>\r\n\r\nOnce upon ",
        ),
        fragment("<f2@poster>", 2, 3, "news.test alt.test:11", "a time there was "),
        fragment(
            "<f3@poster>",
            3,
            3,
            "news.test alt.test:12 alt.misc:4",
            "an archiver.\r\n",
        ),
    ]
}

fn decode(raw: &[u8]) -> ParsedMail {
    MailParserDecoder.decode(raw).unwrap()
}

fn check_complete(mail: &ParsedMail) {
    assert_eq!(mail.message_id.as_deref(), Some("<f1@poster>"));
    assert_eq!(mail.header("message-id"), Some("<f1@poster>"));
    assert_eq!(mail.subject.as_deref(), Some("the whole story"));
    assert_eq!(mail.text.trim(), "Once upon a time there was an archiver.");
    assert_eq!(
        mail.xref.as_deref(),
        Some("news.test alt.test:10 alt.test:11 alt.test:12 alt.misc:4")
    );
    assert!(mail.fragment().is_none());
}

fn staged_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_every_arrival_order_completes_once() {
    let orders: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        let reassembler = Reassembler::new(MemoryStaging::new(), MailParserDecoder);
        let parts = parts();

        for (arrived, &index) in order.iter().enumerate() {
            let outcome = reassembler.accept(decode(&parts[index])).await.unwrap();
            if arrived < 2 {
                assert_eq!(
                    outcome,
                    Reassembly::Pending {
                        arrived: arrived as u32 + 1,
                        total: 3
                    },
                    "order {:?}",
                    order
                );
            } else {
                let Reassembly::Complete(mail) = outcome else {
                    panic!("order {:?} did not complete", order);
                };
                check_complete(&mail);
            }
        }
        assert!(reassembler.staging().is_empty().await);
    }
}

#[tokio::test]
async fn test_staging_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let parts = parts();

    {
        let reassembler = Reassembler::new(FsStaging::new(dir.path()), MailParserDecoder);
        reassembler.accept(decode(&parts[2])).await.unwrap();
        reassembler.accept(decode(&parts[0])).await.unwrap();
    }
    assert_eq!(staged_files(dir.path()), 4);

    let reassembler = Reassembler::new(FsStaging::new(dir.path()), MailParserDecoder);
    let Reassembly::Complete(mail) = reassembler.accept(decode(&parts[1])).await.unwrap() else {
        panic!("expected completion after restart");
    };
    check_complete(&mail);
    assert_eq!(staged_files(dir.path()), 0);
}

#[tokio::test]
async fn test_duplicate_fragment_is_not_double_counted() {
    let reassembler = Reassembler::new(MemoryStaging::new(), MailParserDecoder);
    let parts = parts();

    for _ in 0..2 {
        assert_eq!(
            reassembler.accept(decode(&parts[1])).await.unwrap(),
            Reassembly::Pending {
                arrived: 1,
                total: 3
            }
        );
    }
    assert_eq!(reassembler.staging().len().await, 2);
}

#[tokio::test]
async fn test_completed_set_starts_over() {
    let reassembler = Reassembler::new(MemoryStaging::new(), MailParserDecoder);
    let parts = parts();

    for part in &parts {
        reassembler.accept(decode(part)).await.unwrap();
    }
    assert!(reassembler.staging().is_empty().await);

    // a late repost of one fragment opens a fresh set
    assert_eq!(
        reassembler.accept(decode(&parts[0])).await.unwrap(),
        Reassembly::Pending {
            arrived: 1,
            total: 3
        }
    );
}

#[tokio::test]
async fn test_missing_identity_is_reported() {
    let reassembler = Reassembler::new(MemoryStaging::new(), MailParserDecoder);
    let parts = parts();
    let first = String::from_utf8(parts[0].clone())
        .unwrap()
        .replace("Message-ID: <f1@poster>\r\n", "");

    reassembler.accept(decode(first.as_bytes())).await.unwrap();
    reassembler.accept(decode(&parts[1])).await.unwrap();
    let result = reassembler.accept(decode(&parts[2])).await;

    assert!(matches!(
        result,
        Err(ArchiveError::ReassemblyIdentityMissing(id)) if id == "big@poster"
    ));
    assert_eq!(reassembler.staging().len().await, 6);
}

#[tokio::test]
async fn test_staged_artifacts_use_fragment_keys() {
    let staging = MemoryStaging::new();
    let reassembler = Reassembler::new(&staging, MailParserDecoder);
    reassembler.accept(decode(&parts()[1])).await.unwrap();

    let blob = staging
        .get(&StagingKey::new("big@poster", 2, ArtifactKind::Attachment))
        .await
        .unwrap();
    assert_eq!(blob.as_deref(), Some(&b"a time there was "[..]));

    let metadata = staging
        .get(&StagingKey::new("big@poster", 2, ArtifactKind::Metadata))
        .await
        .unwrap()
        .unwrap();
    let metadata: serde_json::Value = serde_json::from_slice(&metadata).unwrap();
    assert_eq!(metadata["articleId"], "<f2@poster>");
    assert_eq!(metadata["xref"], "news.test alt.test:11");
}
