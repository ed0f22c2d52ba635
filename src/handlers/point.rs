use crate::models::*;
use crate::services::PointService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/points/earn",
    tag = "points",
    request_body = EarnPointsRequest,
    responses(
        (status = 200, description = "Points accrued for the order", body = EarnPointsResponse),
        (status = 409, description = "Points already earned for this order"),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn earn_points(
    point_service: web::Data<PointService>,
    request: web::Json<EarnPointsRequest>,
) -> Result<HttpResponse> {
    let req = request.into_inner();
    match point_service
        .earn_for_order(req.user_id, &req.order_id, req.order_amount)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/points/bonus",
    tag = "points",
    request_body = GrantBonusRequest,
    responses(
        (status = 200, description = "Bonus points granted", body = EarnPointsResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn grant_bonus(
    point_service: web::Data<PointService>,
    request: web::Json<GrantBonusRequest>,
) -> Result<HttpResponse> {
    let req = request.into_inner();
    match point_service
        .grant_bonus(req.user_id, req.amount, req.description)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/points/spend",
    tag = "points",
    request_body = SpendPointsRequest,
    responses(
        (status = 200, description = "Points spent", body = SpendPointsResponse),
        (status = 400, description = "Insufficient balance or invalid request")
    )
)]
pub async fn spend_points(
    point_service: web::Data<PointService>,
    request: web::Json<SpendPointsRequest>,
) -> Result<HttpResponse> {
    let req = request.into_inner();
    match point_service
        .use_points(req.user_id, &req.order_id, req.amount, req.description)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/points/refund",
    tag = "points",
    request_body = RefundPointsRequest,
    responses(
        (status = 200, description = "Clawback recorded", body = RefundPointsResponse),
        (status = 404, description = "No earned points for this order"),
        (status = 400, description = "Invalid refund ratio")
    )
)]
pub async fn refund_points(
    point_service: web::Data<PointService>,
    request: web::Json<RefundPointsRequest>,
) -> Result<HttpResponse> {
    let req = request.into_inner();
    match point_service
        .refund_points(
            req.user_id,
            &req.order_id,
            req.refund_amount,
            req.original_order_amount,
        )
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/points/{user_id}/balance",
    tag = "points",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse)
    )
)]
pub async fn get_balance(
    point_service: web::Data<PointService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match point_service.get_balance(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/points/{user_id}/statistics",
    tag = "points",
    params(
        ("user_id" = i64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Point statistics", body = PointStatisticsResponse)
    )
)]
pub async fn get_statistics(
    point_service: web::Data<PointService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match point_service.get_statistics(path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/points/{user_id}/transactions",
    tag = "points",
    params(
        ("user_id" = i64, Path, description = "User id"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Transaction history")
    )
)]
pub async fn get_transactions(
    point_service: web::Data<PointService>,
    path: web::Path<i64>,
    query: web::Query<PointTransactionQuery>,
) -> Result<HttpResponse> {
    match point_service
        .list_transactions(path.into_inner(), &query)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn point_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/points")
            .route("/earn", web::post().to(earn_points))
            .route("/bonus", web::post().to(grant_bonus))
            .route("/spend", web::post().to(spend_points))
            .route("/refund", web::post().to(refund_points))
            .route("/{user_id}/balance", web::get().to(get_balance))
            .route("/{user_id}/statistics", web::get().to(get_statistics))
            .route("/{user_id}/transactions", web::get().to(get_transactions)),
    );
}
