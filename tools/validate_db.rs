use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use sqlx::Row;
use std::env;

/// Consistency checks over the tables the garbage collector works on
#[derive(Parser)]
struct Cli {
    #[arg(long)]
    database_url: Option<String>,

    /// Blobs left in delete/deleting for longer than this are reported as stuck
    #[arg(long, default_value_t = 24)]
    stuck_hours: i32,

    #[arg(long)]
    fix: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let db_url = cli
        .database_url
        .or_else(|| env::var("DATABASE_URL").ok())
        .context("DATABASE_URL must be set or passed with --database-url")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Find blobs with invalid status
    let invalid_status_rows = sqlx::query(
        r#"SELECT id, digest, status FROM blob WHERE status NOT IN ('none','delete','deleting','deletefailed')"#,
    )
    .fetch_all(&pool)
    .await?;

    println!("Invalid status rows: {}", invalid_status_rows.len());
    for r in invalid_status_rows.iter() {
        let id: i64 = r.get("id");
        let digest: String = r.get("digest");
        let status: String = r.get("status");
        println!("id: {}, digest: {}, status: {}", id, digest, status);
        if cli.fix {
            // deletefailed is re-examined by the next collector run
            sqlx::query(
                "UPDATE blob SET status = 'deletefailed', version = version + 1 WHERE id = $1",
            )
            .bind(id)
            .execute(&pool)
            .await?;
            println!("Fixed: {} -> deletefailed", id);
        }
    }

    // Find blobs an interrupted run left behind
    let stuck_rows = sqlx::query(
        r#"
        SELECT id, digest, status, update_time::text AS update_time
        FROM blob
        WHERE status IN ('delete','deleting')
          AND update_time < now() - make_interval(hours => $1)
        "#,
    )
    .bind(cli.stuck_hours)
    .fetch_all(&pool)
    .await?;

    println!("Stuck blobs (older than {}h): {}", cli.stuck_hours, stuck_rows.len());
    for r in stuck_rows.iter() {
        let id: i64 = r.get("id");
        let digest: String = r.get("digest");
        let status: String = r.get("status");
        let update_time: String = r.get("update_time");
        println!(
            "id: {}, digest: {}, status: {}, updated: {}",
            id, digest, status, update_time
        );
        if cli.fix {
            sqlx::query(
                "UPDATE blob SET status = 'deletefailed', version = version + 1 WHERE id = $1 AND status = $2",
            )
            .bind(id)
            .bind(&status)
            .execute(&pool)
            .await?;
            println!("Fixed: {} {} -> deletefailed", id, status);
        }
    }

    // Find associations pointing at missing blobs or projects
    let dangling_rows = sqlx::query(
        r#"
        SELECT pb.id, pb.project_id, pb.blob_id
        FROM project_blob pb
        LEFT JOIN blob b ON b.id = pb.blob_id
        LEFT JOIN project p ON p.id = pb.project_id
        WHERE b.id IS NULL OR p.id IS NULL
        "#,
    )
    .fetch_all(&pool)
    .await?;

    println!("Dangling project_blob rows: {}", dangling_rows.len());
    for r in dangling_rows.iter() {
        let id: i64 = r.get("id");
        let project_id: i64 = r.get("project_id");
        let blob_id: i64 = r.get("blob_id");
        println!("id: {}, project_id: {}, blob_id: {}", id, project_id, blob_id);
        if cli.fix {
            sqlx::query("DELETE FROM project_blob WHERE id = $1")
                .bind(id)
                .execute(&pool)
                .await?;
            println!("Removed: {}", id);
        }
    }

    // Find blobs whose digest is not algorithm:encoded
    let invalid_digests = sqlx::query(
        r#"SELECT id, digest FROM blob WHERE digest !~ '^[a-z0-9]+([.+_-][a-z0-9]+)*:[a-zA-Z0-9=_-]+$'"#,
    )
    .fetch_all(&pool)
    .await?;

    println!("Invalid digest rows: {}", invalid_digests.len());
    for r in invalid_digests.iter() {
        let id: i64 = r.get("id");
        let digest: String = r.get("digest");
        println!("id: {}, digest: {:?}", id, digest);
    }

    Ok(())
}
