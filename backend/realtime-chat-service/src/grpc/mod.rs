use crate::nova::realtime_chat::v1::{
    realtime_chat_service_server::RealtimeChatService, ExchangeKeysRequest, ExchangeKeysResponse,
    GetConversationRequest, GetConversationResponse, GetMessageHistoryRequest,
    GetMessageHistoryResponse, GetPublicKeyRequest, GetPublicKeyResponse, SendMessageRequest,
    SendMessageResponse, StartCallRequest, StartCallResponse, EndCallRequest, EndCallResponse,
    StreamMessagesRequest, MessageEvent, TypingIndicatorRequest, TypingIndicatorResponse,
    UpdateCallStatusRequest, UpdateCallStatusResponse,
};
use crate::state::AppState;
use tonic::{Request, Response, Status};

pub struct RealtimeChatServiceImpl {
    state: AppState,
}

impl RealtimeChatServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl RealtimeChatService for RealtimeChatServiceImpl {
    async fn send_message(
        &self,
        request: Request<SendMessageRequest>,
    ) -> Result<Response<SendMessageResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement send_message logic
        Err(Status::unimplemented("send_message not yet implemented"))
    }

    async fn get_conversation(
        &self,
        request: Request<GetConversationRequest>,
    ) -> Result<Response<GetConversationResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement get_conversation logic
        Err(Status::unimplemented("get_conversation not yet implemented"))
    }

    async fn get_message_history(
        &self,
        request: Request<GetMessageHistoryRequest>,
    ) -> Result<Response<GetMessageHistoryResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement get_message_history logic
        Err(Status::unimplemented(
            "get_message_history not yet implemented",
        ))
    }

    type StreamMessagesStream =
        tokio_stream::wrappers::ReceiverStream<Result<MessageEvent, Status>>;

    async fn stream_messages(
        &self,
        request: Request<StreamMessagesRequest>,
    ) -> Result<Response<Self::StreamMessagesStream>, Status> {
        let _req = request.into_inner();
        // TODO: Implement stream_messages logic
        Err(Status::unimplemented("stream_messages not yet implemented"))
    }

    async fn exchange_keys(
        &self,
        request: Request<ExchangeKeysRequest>,
    ) -> Result<Response<ExchangeKeysResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement exchange_keys logic
        Err(Status::unimplemented("exchange_keys not yet implemented"))
    }

    async fn get_public_key(
        &self,
        request: Request<GetPublicKeyRequest>,
    ) -> Result<Response<GetPublicKeyResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement get_public_key logic
        Err(Status::unimplemented("get_public_key not yet implemented"))
    }

    async fn send_typing_indicator(
        &self,
        request: Request<TypingIndicatorRequest>,
    ) -> Result<Response<TypingIndicatorResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement send_typing_indicator logic
        Err(Status::unimplemented(
            "send_typing_indicator not yet implemented",
        ))
    }

    async fn start_call(
        &self,
        request: Request<StartCallRequest>,
    ) -> Result<Response<StartCallResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement start_call logic
        Err(Status::unimplemented("start_call not yet implemented"))
    }

    async fn end_call(
        &self,
        request: Request<EndCallRequest>,
    ) -> Result<Response<EndCallResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement end_call logic
        Err(Status::unimplemented("end_call not yet implemented"))
    }

    async fn update_call_status(
        &self,
        request: Request<UpdateCallStatusRequest>,
    ) -> Result<Response<UpdateCallStatusResponse>, Status> {
        let _req = request.into_inner();
        // TODO: Implement update_call_status logic
        Err(Status::unimplemented(
            "update_call_status not yet implemented",
        ))
    }
}
