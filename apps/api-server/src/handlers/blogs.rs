//! Blog handlers: public reads plus author-only mutations.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::{AuthorSummary, Blog, BlogChanges, NewBlog};
use quill_core::query::{ListingParams, OwnListingParams, Page};
use quill_core::services::BlogView;
use quill_shared::ApiResponse;
use quill_shared::dto::{
    AuthorResponse, BlogListResponse, BlogResponse, CreateBlogRequest, ListBlogsQuery,
    MyBlogsQuery, UpdateBlogRequest,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

fn author_response(author: AuthorSummary) -> AuthorResponse {
    AuthorResponse {
        id: author.id,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        email: author.email,
    }
}

fn blog_response(blog: Blog, author: Option<AuthorSummary>) -> BlogResponse {
    BlogResponse {
        id: blog.id,
        title: blog.title,
        description: blog.description,
        body: blog.body,
        tags: blog.tags,
        state: blog.state.to_string(),
        read_count: blog.read_count,
        reading_time: blog.reading_time,
        author_id: blog.author_id,
        author: author.map(author_response),
        created_at: blog.created_at,
        updated_at: blog.updated_at,
    }
}

fn view_response(view: BlogView) -> BlogResponse {
    blog_response(view.blog, view.author)
}

fn list_response<T>(page: Page<T>, f: impl FnMut(T) -> BlogResponse) -> BlogListResponse {
    BlogListResponse {
        total: page.total,
        page: page.page,
        limit: page.limit,
        pages: page.pages,
        blogs: page.items.into_iter().map(f).collect(),
    }
}

/// POST /api/blogs
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreateBlogRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let blog = state
        .blogs
        .create(
            &identity.actor(),
            NewBlog {
                title: req.title,
                description: req.description,
                body: req.body,
                tags: req.tags,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        blog_response(blog, None),
        "Blog created successfully",
    )))
}

/// GET /api/blogs - published posts with filters, search, sort and paging
pub async fn list(
    state: web::Data<AppState>,
    query: web::Query<ListBlogsQuery>,
) -> AppResult<HttpResponse> {
    let q = query.into_inner();
    let params = ListingParams {
        title: q.title,
        author: q.author,
        tags: q.tags,
        search: q.search,
        order_by: q.order_by,
        order: q.order,
        page: q.page,
        limit: q.limit,
    };

    let page = state.blogs.list_published(&params).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list_response(page, view_response))))
}

/// GET /api/blogs/my-blogs
pub async fn my_blogs(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<MyBlogsQuery>,
) -> AppResult<HttpResponse> {
    let q = query.into_inner();
    let params = OwnListingParams {
        state: q.state,
        page: q.page,
        limit: q.limit,
    };

    let page = state.blogs.list_own(&identity.actor(), &params).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list_response(page, |blog| {
        blog_response(blog, None)
    }))))
}

/// GET /api/blogs/{id} - counts as a read
pub async fn read(state: web::Data<AppState>, path: web::Path<Uuid>) -> AppResult<HttpResponse> {
    let view = state.blogs.read_published(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(view_response(view))))
}

/// PATCH /api/blogs/publish/{id}
pub async fn publish(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let blog = state
        .blogs
        .publish(&identity.actor(), path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        blog_response(blog, None),
        "Blog published successfully",
    )))
}

/// PUT /api/blogs/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<UpdateBlogRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let changes = BlogChanges {
        title: req.title,
        description: req.description,
        body: req.body,
        tags: req.tags,
    };

    let blog = state
        .blogs
        .update(&identity.actor(), path.into_inner(), changes)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        blog_response(blog, None),
        "Blog updated successfully",
    )))
}

/// DELETE /api/blogs/{id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .blogs
        .delete(&identity.actor(), path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Blog deleted successfully")))
}
