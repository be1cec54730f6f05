use ormlite::Model;
use uuid::Uuid;

use crate::libs::error::AnyResult;
use crate::libs::selected_directory::SelectedDirectory;

use super::core::DB;

impl DB {
    /// Get all scan roots from the database
    pub async fn get_all_selected_directories(&mut self) -> AnyResult<Vec<SelectedDirectory>> {
        let directories = SelectedDirectory::select()
            .fetch_all(&mut self.connection)
            .await?;
        Ok(directories)
    }

    /// Register a directory as a scan root. A previous row for the same
    /// path is replaced.
    pub async fn insert_selected_directory(
        &mut self,
        directory: &str,
    ) -> AnyResult<SelectedDirectory> {
        let selected = SelectedDirectory {
            id: Uuid::new_v4().to_string(),
            directory: directory.to_string(),
        };

        ormlite::query("INSERT OR REPLACE INTO selected_directories (id, directory) VALUES (?, ?)")
            .bind(&selected.id)
            .bind(&selected.directory)
            .execute(&mut self.connection)
            .await?;

        Ok(selected)
    }

    /// Remove a scan root by path
    pub async fn delete_selected_directory(&mut self, directory: &str) -> AnyResult<()> {
        ormlite::query("DELETE FROM selected_directories WHERE directory = ?")
            .bind(directory)
            .execute(&mut self.connection)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::libs::database::DB;

    #[tokio::test]
    async fn insert_is_replace_on_conflict() {
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        let first = db.insert_selected_directory("/music").await.unwrap();
        let second = db.insert_selected_directory("/music").await.unwrap();
        db.insert_selected_directory("/podcasts").await.unwrap();

        let all = db.get_all_selected_directories().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|d| d.id == second.id));
        assert!(!all.iter().any(|d| d.id == first.id));
    }

    #[tokio::test]
    async fn delete_removes_only_the_given_root() {
        let mut db = DB::open_in_memory().await.unwrap();
        db.create_tables().await.unwrap();

        db.insert_selected_directory("/music").await.unwrap();
        db.insert_selected_directory("/podcasts").await.unwrap();
        db.delete_selected_directory("/music").await.unwrap();

        let all = db.get_all_selected_directories().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].directory, "/podcasts");
    }
}
