pub mod auth;
pub mod error;
pub(crate) mod guard;
pub mod members;
pub mod projects;
pub mod tasks;
pub mod workspaces;

use axum::extract::Multipart;
use uuid::Uuid;

use self::error::ErrorResponse;

/// Fields shared by the workspace and project multipart forms.
#[derive(Debug, Default)]
pub(crate) struct EntityForm {
    pub name: Option<String>,
    pub workspace_id: Option<Uuid>,
    pub image_data: Option<Vec<u8>>,
}

pub(crate) async fn read_entity_form(
    multipart: &mut Multipart,
) -> Result<EntityForm, ErrorResponse> {
    let mut form = EntityForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ErrorResponse::bad_request("malformed multipart body"))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ErrorResponse::bad_request("malformed `name` field"))?;
                form.name = Some(value);
            }
            Some("workspace_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ErrorResponse::bad_request("malformed `workspace_id` field"))?;
                let id = value
                    .parse::<Uuid>()
                    .map_err(|_| ErrorResponse::bad_request("`workspace_id` is not a valid id"))?;
                form.workspace_id = Some(id);
            }
            Some("image") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ErrorResponse::bad_request("malformed `image` field"))?;
                form.image_data = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    Ok(form)
}
