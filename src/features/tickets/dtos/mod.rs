mod ticket_dto;

pub use ticket_dto::{
    BoardResponseDto, CreateTicketDto, SessionResponseDto, TicketResponseDto,
    TicketStatusUpdateDto, UpdateStatusesDto,
};
